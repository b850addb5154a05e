//! HTTP surface of the webhook receiver.
//!
//! Routes:
//! - `POST /api/webhooks` registers a webhook
//! - `POST /api/webhooks/{id}/messages` stores a message
//! - `GET /api/webhooks/{id}/messages` lists stored messages
//! - `GET /health`
//!
//! Everything else answers 404.

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, on, post, MethodFilter},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    get_messages, health, not_found, post_message, register_webhook, AppState, ErrorResponse,
    HealthResponse,
};

/// Largest request body accepted, in bytes (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/webhooks", post(register_webhook).fallback(not_found))
        .route(
            "/api/webhooks/:webhook_id/messages",
            // `get` would also answer HEAD
            on(MethodFilter::GET, get_messages)
                .post(post_message)
                .fallback(not_found),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
