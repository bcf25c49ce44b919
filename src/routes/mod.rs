//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one trainer per connection)
/// - Session-scoped API under `/api/v1/sessions/:id/...`
/// - Static SPA from `./static` with index fallback
/// - CORS limited to the configured origins (none by default)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));
    let cors = cors_layer(&state.config.http.allowed_origins);

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/sessions", post(http::http_create_session))
        .route("/api/v1/sessions/:id", delete(http::http_delete_session))
        .route("/api/v1/sessions/:id/load", post(http::http_load))
        .route("/api/v1/sessions/:id/direction", post(http::http_choose_direction))
        .route("/api/v1/sessions/:id/next", post(http::http_next))
        .route("/api/v1/sessions/:id/answer", post(http::http_answer))
        .route("/api/v1/sessions/:id/reveal", post(http::http_reveal))
        .route("/api/v1/sessions/:id/hide", post(http::http_hide))
        .route("/api/v1/sessions/:id/stats", get(http::http_stats))
        .route("/api/v1/sessions/:id/export", post(http::http_export))
        .route("/api/v1/convert", post(http::http_convert))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

/// Explicit origin list; a wildcard or malformed entry is skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            if origin.trim() == "*" {
                warn!(target: "vocab_drill_backend", "Wildcard CORS origin ignored; list origins explicitly");
                return None;
            }
            match HeaderValue::from_str(origin.trim()) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(target: "vocab_drill_backend", %origin, error = %e, "Invalid CORS origin ignored");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
