//! MailRelay - inbound email to chat webhook relay.
//!
//! This library provides shared modules for the two MailRelay binaries:
//! - `mailrelay-web`: web server receiving emails from the edge worker
//! - `mailrelay-send`: replays a raw `.eml` file through the same pipeline
//!
//! ## Architecture
//!
//! ```text
//! Edge worker → Web Server → extract → webhook payload → Chat webhook
//!                                    ↘ forward raw email (optional)
//! ```

pub mod config;
pub mod extract;
pub mod forward;
pub mod inbound;
pub mod relay;
pub mod web;
pub mod webhook;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{Config, ConfigError, RelayMode};
pub use extract::{extract, ExtractedEmail};
pub use forward::{ForwardError, Forwarder, SmtpForwarder};
pub use inbound::InboundEmail;
pub use relay::{Relay, RelayReport};
pub use web::AppState;
pub use webhook::{DeliveryOutcome, WebhookClient, WebhookPayload};
