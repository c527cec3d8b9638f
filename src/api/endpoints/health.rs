//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// "ready" or "degraded"
    pub retrieval: &'static str,
    pub model_id: Option<String>,
    pub entry_count: usize,
    pub degraded_responses: u64,
    pub total_responses: u64,
}

/// `GET /health`: liveness plus retrieval state.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = ctx.assistant.stats();

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        retrieval: stats.mode.as_str(),
        model_id: stats.model_id,
        entry_count: stats.entry_count,
        degraded_responses: stats.degraded_responses,
        total_responses: stats.total_responses,
    }))
}
