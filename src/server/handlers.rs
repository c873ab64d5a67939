use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

use super::AppState;
use crate::cache::CacheKey;
use crate::error::SubfuseError;
use crate::provider::{ProviderFactory, models};
use crate::workflow::TranscribeRequest;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// HTTP error type, rendered as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<SubfuseError> for ApiError {
    fn from(err: SubfuseError) -> Self {
        match err {
            SubfuseError::Validation(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Subfuse subtitle transcription service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "providers": ProviderFactory::list(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /models
pub async fn list_models() -> Json<Value> {
    Json(json!({ "providers": models::catalog() }))
}

/// POST /transcribe
///
/// Validates the body, then streams the pipeline's events as NDJSON.
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let request = request.validate()?;
    info!(
        "Accepted transcription of {} via {} to {}",
        request.locator.video_id,
        request.provider.name(),
        request.target_language
    );

    let events = state.workflow.start(request);
    let mut response = Body::from_stream(events.into_ndjson_stream()).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(NDJSON_CONTENT_TYPE));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

/// GET /cache
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.cache.stats()))
}

/// GET /cache/{video_id}/{lang}
pub async fn inspect_cache_entry(
    State(state): State<Arc<AppState>>,
    Path((video_id, language)): Path<(String, String)>,
) -> Json<Value> {
    match state.cache.inspect(&CacheKey::new(video_id, language)) {
        Some(info) => Json(json!({
            "found": true,
            "cached_at": info.cached_at,
            "age_secs": info.age_secs,
            "size": info.size,
        })),
        None => Json(json!({ "found": false })),
    }
}

/// DELETE /cache/{video_id}/{lang}
pub async fn delete_cache_entry(
    State(state): State<Arc<AppState>>,
    Path((video_id, language)): Path<(String, String)>,
) -> Json<Value> {
    let found = state.cache.remove(&CacheKey::new(video_id, language));
    Json(json!({ "found": found }))
}

/// DELETE /cache/{video_id}
pub async fn delete_cache_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Json<Value> {
    let removed = state.cache.remove_content(&video_id);
    Json(json!({ "removed_count": removed }))
}

/// DELETE /cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let removed = state.cache.clear()?;
    Ok(Json(json!({ "removed_count": removed })))
}
