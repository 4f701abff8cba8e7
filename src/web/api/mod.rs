//! Management API (`/api/v1`)

pub mod active_streams;

use axum::{Router, routing::get};

use crate::web::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/active-streams", get(active_streams::get_active_streams))
}
