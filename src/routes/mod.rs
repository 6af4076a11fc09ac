//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
  routing::{get, post},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - student endpoints (`/api/v1/lottery`, `/api/v1/reroll`)
/// - admin endpoints (`/api/v1/history`, `/api/v1/admin/...`)
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/api/v1/health", get(http::http_health))
    .route("/api/v1/catalog", get(http::http_get_catalog))
    .route("/api/v1/lottery", post(http::http_post_lottery))
    .route("/api/v1/reroll", post(http::http_post_reroll))
    .route("/api/v1/history", get(http::http_get_history))
    .route("/api/v1/admin/assign", post(http::http_post_assign))
    .route("/api/v1/admin/unassign", post(http::http_post_unassign))
    .route("/api/v1/admin/roster/reload", post(http::http_post_reload_roster))
    .with_state(state)
    .layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any),
    )
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
