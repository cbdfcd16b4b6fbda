//! Chat webhook output.
//!
//! - [`payload`]: message formats (plain text and embed)
//! - [`client`]: HTTP delivery

pub mod client;
pub mod payload;

pub use client::{DeliveryOutcome, WebhookClient};
pub use payload::{build_embed, build_plain, gravatar_url, WebhookPayload};
