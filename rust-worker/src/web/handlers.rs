//! Inbound email endpoint handlers.
//!
//! The edge worker POSTs each email here. The relay runs inline; its
//! failures are logged and reported in the body, never as a 5xx.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::inbound::InboundEmail;
use crate::relay::Relay;
use crate::Config;

/// Header carrying the shared secret.
pub const AUTH_HEADER: &str = "X-Custom-Auth";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(config: Config, relay: Relay) -> Self {
        Self {
            config: Arc::new(config),
            relay: Arc::new(relay),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Email Endpoint
// =============================================================================

/// Email endpoint response.
#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub status: &'static str,
    /// Forward result, `null` when forwarding is not configured
    pub forwarded: Option<bool>,
}

/// Outcome of checking the auth header.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthCheck {
    Allowed,
    /// No token configured, every request passes
    NotConfigured,
    Missing,
    Invalid,
}

/// Compare the provided auth header with the configured token.
pub fn check_auth(provided: Option<&str>, expected: Option<&str>) -> AuthCheck {
    match (provided, expected) {
        (Some(provided), Some(expected)) if provided == expected => AuthCheck::Allowed,
        (None, Some(_)) => AuthCheck::Missing,
        (Some(_), Some(_)) => AuthCheck::Invalid,
        (_, None) => AuthCheck::NotConfigured,
    }
}

/// Email endpoint.
///
/// This endpoint:
/// 1. Verifies the X-Custom-Auth header (if configured)
/// 2. Relays the email to the webhook and forward mailbox
/// 3. Returns 200 OK with the relay outcome
pub async fn email_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(email): Json<InboundEmail>,
) -> impl IntoResponse {
    info!(
        from = %email.from_field,
        to = %email.to,
        raw_length = email.raw.len(),
        "email_received"
    );

    let provided = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());

    match check_auth(provided, state.config.cloudflare_auth_token.as_deref()) {
        AuthCheck::Allowed => {}
        AuthCheck::NotConfigured => {
            warn!("email_auth_not_configured");
        }
        AuthCheck::Missing => {
            warn!(to = %email.to, "email_auth_missing");
            return (
                StatusCode::UNAUTHORIZED,
                Json(EmailResponse {
                    status: "unauthorized",
                    forwarded: None,
                }),
            );
        }
        AuthCheck::Invalid => {
            warn!(to = %email.to, "email_auth_invalid");
            return (
                StatusCode::UNAUTHORIZED,
                Json(EmailResponse {
                    status: "unauthorized",
                    forwarded: None,
                }),
            );
        }
    }

    let report = state.relay.handle(&email).await;

    let status = if report.delivery.is_delivered() {
        "relayed"
    } else {
        "webhook_failed"
    };

    (
        StatusCode::OK,
        Json(EmailResponse {
            status,
            forwarded: report.forwarded,
        }),
    )
}
