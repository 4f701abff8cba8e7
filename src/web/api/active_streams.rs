//! Active stream metrics API

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;
use tracing::debug;

use crate::web::AppState;

/// GET /api/v1/active-streams
pub async fn get_active_streams(State(state): State<AppState>) -> impl IntoResponse {
    let streams = state.active_streams.list();
    debug!("Listing {} active streams", streams.len());

    let total_bytes_sent: u64 = streams.iter().map(|s| s.bytes_sent).sum();

    Json(json!({
        "status": "success",
        "data": {
            "total_active_streams": streams.len(),
            "max_streams": state.active_streams.max_streams(),
            "total_bytes_sent": total_bytes_sent,
            "streams": streams,
        }
    }))
}
