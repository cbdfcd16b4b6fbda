//! Relay pipeline - one inbound email in, one webhook message out.
//!
//! ```text
//! InboundEmail → extract → build payload → POST → forward (optional)
//! ```
//!
//! Every step is best-effort. Failures are logged and reported in the
//! [`RelayReport`], never returned as errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{Config, RelayMode};
use crate::extract::extract;
use crate::forward::{Forwarder, SmtpForwarder};
use crate::inbound::InboundEmail;
use crate::webhook::{build_embed, build_plain, DeliveryOutcome, WebhookClient};

/// Mailbox receiving forwarded copies.
struct ForwardTarget {
    address: String,
    forwarder: Arc<dyn Forwarder>,
}

/// What happened to one email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayReport {
    pub delivery: DeliveryOutcome,
    /// `None` when forwarding is not configured
    pub forwarded: Option<bool>,
}

/// Relays inbound emails to the webhook.
pub struct Relay {
    mode: RelayMode,
    webhook: WebhookClient,
    forward: Option<ForwardTarget>,
}

impl Relay {
    pub fn new(mode: RelayMode, webhook: WebhookClient) -> Self {
        Self {
            mode,
            webhook,
            forward: None,
        }
    }

    /// Also forward every raw email to `address`.
    pub fn with_forwarding(mut self, address: impl Into<String>, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forward = Some(ForwardTarget {
            address: address.into(),
            forwarder,
        });
        self
    }

    /// Build a relay from configuration.
    ///
    /// Forwarding needs both `FORWARD_EMAIL_ADDRESS` and `SMTP_URL`; with only
    /// the address set it is disabled with a warning.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let webhook = WebhookClient::new(
            client,
            config.webhook_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        );

        let relay = Relay::new(config.relay_mode, webhook);

        match (&config.forward_email_address, &config.smtp_url) {
            (Some(address), Some(smtp_url)) => {
                let forwarder =
                    SmtpForwarder::from_url(smtp_url).context("Invalid SMTP_URL")?;
                info!(forward_to = %address, "forward_enabled");
                Ok(relay.with_forwarding(address.clone(), Arc::new(forwarder)))
            }
            (Some(address), None) => {
                warn!(forward_to = %address, "forward_disabled_no_smtp_url");
                Ok(relay)
            }
            (None, _) => Ok(relay),
        }
    }

    pub fn mode(&self) -> RelayMode {
        self.mode
    }

    pub fn forwarding_enabled(&self) -> bool {
        self.forward.is_some()
    }

    /// Relay one email.
    pub async fn handle(&self, email: &InboundEmail) -> RelayReport {
        info!(
            mode = %self.mode,
            from = %email.from_field,
            to = %email.to,
            raw_length = email.raw.len(),
            "relay_start"
        );

        let extracted = extract(email, self.mode);

        let payload = match self.mode {
            RelayMode::Embed => build_embed(email, &extracted),
            RelayMode::Legacy | RelayMode::Plain => build_plain(email, &extracted),
        };

        let delivery = self.webhook.send(&payload).await;

        let forwarded = match &self.forward {
            Some(target) => Some(self.forward_raw(target, email).await),
            None => None,
        };

        info!(
            delivered = delivery.is_delivered(),
            forwarded = ?forwarded,
            "relay_complete"
        );

        RelayReport {
            delivery,
            forwarded,
        }
    }

    async fn forward_raw(&self, target: &ForwardTarget, email: &InboundEmail) -> bool {
        match target
            .forwarder
            .forward(&email.from_field, &target.address, &email.raw)
            .await
        {
            Ok(()) => {
                info!(forward_to = %target.address, "forward_complete");
                true
            }
            Err(e) => {
                error!(forward_to = %target.address, error = %e, "forward_failed");
                false
            }
        }
    }
}
