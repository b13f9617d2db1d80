//! Router assembly: HTTP endpoints, static files, CORS, body limit, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - Body limit sized for base64 uploads of the largest accepted document
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let body_limit = state.config.limits.max_body_bytes();

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/options", get(http::http_get_options))
        .route("/api/v1/settings", get(http::http_get_settings).put(http::http_put_settings))
        .route("/api/v1/validate", post(http::http_post_validate))
        .route("/api/v1/plans", post(http::http_post_plan))
        .route("/api/v1/plans/:id", get(http::http_get_plan).delete(http::http_delete_plan))
        .route("/api/v1/plans/:id/export/doc", get(http::http_export_doc))
        .route("/api/v1/plans/:id/export/simulation", get(http::http_export_simulation))
        // State + body limit + CORS + HTTP tracing
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
