//! HTTP router.
//!
//! Layers (outermost → innermost): CORS → no-store cache header → handler.

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::pipeline::rag::MedicalAssistant;

/// Build the API router around a shared assistant.
pub fn api_router(assistant: Arc<MedicalAssistant>) -> Router {
    build_router(ApiContext::new(assistant))
}

fn build_router(ctx: ApiContext) -> Router {
    // Dashboard and mobile clients run on other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(endpoints::analyze::analyze))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        // Advisories are per-event and must not be served from a cache
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
}
