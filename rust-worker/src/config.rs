//! Configuration module for environment variable parsing.
//!
//! All settings come from the environment. Only the webhook URL is required;
//! everything else has a default.

use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// How an inbound email is turned into a webhook message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Hand-rolled text extractor, plain `content` message
    Legacy,
    /// MIME library extraction, plain `content` message
    Plain,
    /// MIME library extraction, embed message with sender avatar
    Embed,
}

impl RelayMode {
    /// Whether the body is extracted with the MIME parsing library.
    pub fn uses_mime_parser(self) -> bool {
        !matches!(self, RelayMode::Legacy)
    }
}

impl FromStr for RelayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(RelayMode::Legacy),
            "plain" => Ok(RelayMode::Plain),
            "embed" => Ok(RelayMode::Embed),
            other => Err(format!("unknown relay mode: {}", other)),
        }
    }
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayMode::Legacy => "legacy",
            RelayMode::Plain => "plain",
            RelayMode::Embed => "embed",
        };
        f.write_str(name)
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat webhook endpoint receiving the relayed message
    pub webhook_url: Url,

    /// Optional mailbox that receives a copy of every raw email
    pub forward_email_address: Option<String>,

    /// SMTP relay URL used for forwarding (lettre URL syntax)
    pub smtp_url: Option<String>,

    /// Extraction and formatting strategy
    pub relay_mode: RelayMode,

    /// Shared secret expected in the X-Custom-Auth header
    pub cloudflare_auth_token: Option<String>,

    /// Port for the web server to listen on
    pub port: u16,

    /// Webhook request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Maximum accepted size of an inbound request body
    pub max_email_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url =
            non_empty_var("DISCORD_WEBHOOK_URL").ok_or(ConfigError::Missing("DISCORD_WEBHOOK_URL"))?;
        let webhook_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            name: "DISCORD_WEBHOOK_URL",
            source,
        })?;

        Ok(Config {
            webhook_url,

            forward_email_address: non_empty_var("FORWARD_EMAIL_ADDRESS"),

            smtp_url: non_empty_var("SMTP_URL"),

            relay_mode: parse_or("RELAY_MODE", RelayMode::Embed),

            cloudflare_auth_token: non_empty_var("CLOUDFLARE_AUTH_TOKEN"),

            port: parse_or("PORT", 8080),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000),

            max_email_bytes: parse_or("MAX_EMAIL_BYTES", 25 * 1024 * 1024),
        })
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    let raw = match non_empty_var(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}
