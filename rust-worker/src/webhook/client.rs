//! Webhook delivery over HTTP.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};
use url::Url;

use super::payload::WebhookPayload;

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The endpoint answered with a 2xx status
    Delivered { status: u16 },
    /// The endpoint answered with a non-success status
    Rejected { status: u16, body: String },
    /// The request never got a response
    Failed { error: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Posts payloads to a single webhook URL.
///
/// Each payload is sent once; failures are logged and reported, never retried.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl WebhookClient {
    pub fn new(client: Client, url: Url, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
        }
    }

    /// Webhook host, safe to log (the path carries the webhook token).
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    /// POST `payload` as JSON.
    pub async fn send(&self, payload: &WebhookPayload) -> DeliveryOutcome {
        info!(
            host = %self.host(),
            embeds = payload.embeds.len(),
            content_length = payload.content.as_ref().map(|c| c.len()).unwrap_or(0),
            "webhook_send_starting"
        );

        let response = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    info!(status_code = status.as_u16(), "webhook_delivered");
                    return DeliveryOutcome::Delivered {
                        status: status.as_u16(),
                    };
                }

                let body = resp.text().await.unwrap_or_default();
                let payload_json = serde_json::to_string(payload).unwrap_or_default();

                error!(
                    status_code = status.as_u16(),
                    status_text = status.canonical_reason().unwrap_or(""),
                    response_body = %body,
                    payload = %payload_json,
                    "webhook_rejected"
                );

                DeliveryOutcome::Rejected {
                    status: status.as_u16(),
                    body,
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    error!(
                        host = %self.host(),
                        timeout_seconds = self.timeout.as_secs_f64(),
                        error = %e,
                        "webhook_timeout"
                    );
                } else {
                    error!(host = %self.host(), error = %e, "webhook_request_error");
                }

                DeliveryOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_capture_server;
    use axum::http::StatusCode;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            content: Some("hello".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_delivered() {
        let server = spawn_capture_server(StatusCode::NO_CONTENT).await;
        let client = WebhookClient::new(Client::new(), server.url.clone(), Duration::from_secs(5));

        let outcome = client.send(&payload()).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { status: 204 });
        let received = server.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["content"], "hello");
    }

    #[tokio::test]
    async fn test_send_rejected_keeps_body() {
        let server = spawn_capture_server(StatusCode::BAD_REQUEST).await;
        let client = WebhookClient::new(Client::new(), server.url.clone(), Duration::from_secs(5));

        let outcome = client.send(&payload()).await;

        match outcome {
            DeliveryOutcome::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "captured");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/hook", addr)).unwrap();
        let client = WebhookClient::new(Client::new(), url, Duration::from_secs(2));

        let outcome = client.send(&payload()).await;

        assert!(matches!(outcome, DeliveryOutcome::Failed { .. }));
        assert!(!outcome.is_delivered());
    }

    #[test]
    fn test_delivery_outcome_serialization() {
        let json = serde_json::to_value(DeliveryOutcome::Delivered { status: 204 }).unwrap();
        assert_eq!(json["outcome"], "delivered");
        assert_eq!(json["status"], 204);
    }
}
