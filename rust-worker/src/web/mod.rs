//! Web server module for receiving inbound emails.
//!
//! The edge email worker posts each message here as JSON. The handler
//! authenticates the request and runs the relay inline.

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    check_auth, email_webhook, health, AppState, AuthCheck, EmailResponse, HealthResponse,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_email_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/email", post(email_webhook))
        .route("/webhooks/cloudflare", post(email_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
