//! Search and related-media handlers

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::require_param;
use crate::errors::AppResult;
use crate::models::MediaListItem;
use crate::web::{AppState, responses::handle_error};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedParams {
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoList {
    pub videos: Vec<MediaListItem>,
}

/// GET /search?q=<query>
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    into_response(run_search(&state, params.q).await)
}

/// GET /related?url=<media url>
pub async fn related(State(state): State<AppState>, Query(params): Query<RelatedParams>) -> Response {
    into_response(run_related(&state, params.url).await)
}

async fn run_search(state: &AppState, q: Option<String>) -> AppResult<VideoList> {
    let query = require_param(q, "q")?;
    let _permit = state.active_streams.try_acquire_lookup()?;
    let videos = state.search.search(&query).await?;
    Ok(VideoList { videos })
}

async fn run_related(state: &AppState, url: Option<String>) -> AppResult<VideoList> {
    let url = require_param(url, "url")?;
    let _permit = state.active_streams.try_acquire_lookup()?;
    let videos = state.search.related_to(&url).await?;
    Ok(VideoList { videos })
}

fn into_response(result: AppResult<VideoList>) -> Response {
    match result {
        Ok(list) => Json(list).into_response(),
        Err(e) => handle_error(e),
    }
}
