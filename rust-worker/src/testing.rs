//! Test helpers: a local webhook endpoint and an in-memory forwarder.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use url::Url;

use crate::forward::{ForwardError, Forwarder};

/// Webhook endpoint on an ephemeral port that records every JSON body.
pub struct CaptureServer {
    pub url: Url,
    received: Arc<Mutex<Vec<Value>>>,
}

impl CaptureServer {
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

type CaptureState = (Arc<Mutex<Vec<Value>>>, StatusCode);

async fn capture(
    State((received, status)): State<CaptureState>,
    Json(body): Json<Value>,
) -> (StatusCode, &'static str) {
    received.lock().unwrap().push(body);
    (status, "captured")
}

/// Start a capture server answering every POST with `status`.
pub async fn spawn_capture_server(status: StatusCode) -> CaptureServer {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/hook", post(capture))
        .with_state((Arc::clone(&received), status));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    CaptureServer {
        url: Url::parse(&format!("http://{}/hook", addr)).unwrap(),
        received,
    }
}

/// A forwarded message as seen by [`RecordingForwarder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardedMessage {
    pub envelope_from: String,
    pub to: String,
    pub raw: Vec<u8>,
}

/// Forwarder that records calls and optionally fails them.
#[derive(Default)]
pub struct RecordingForwarder {
    pub fail: bool,
    calls: Mutex<Vec<ForwardedMessage>>,
}

impl RecordingForwarder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ForwardedMessage> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward(&self, envelope_from: &str, to: &str, raw: &[u8]) -> Result<(), ForwardError> {
        self.calls.lock().unwrap().push(ForwardedMessage {
            envelope_from: envelope_from.to_string(),
            to: to.to_string(),
            raw: raw.to_vec(),
        });

        if self.fail {
            let invalid = "not an address".parse::<lettre::Address>().unwrap_err();
            Err(ForwardError::InvalidAddress(invalid))
        } else {
            Ok(())
        }
    }
}
