//! Health check HTTP handler

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::services::ToolReport;
use crate::web::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_streams: usize,
    pub max_streams: usize,
    pub tools: ToolReport,
}

/// GET /health
///
/// Reports `degraded` when the transcoder or every resolver is missing.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let tools = state.tools.as_ref().clone();
    let status = if tools.transcoder.available && tools.resolver.available {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        active_streams: state.active_streams.count(),
        max_streams: state.active_streams.max_streams(),
        tools,
    })
}
