//! MailRelay Send - relay a raw email file without the web server.
//!
//! Reads an RFC 5322 message from a file (or stdin), runs it through the
//! same extract/format/deliver/forward pipeline as the web server and prints
//! the relay report as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailrelay::{Config, InboundEmail, Relay, RelayMode};

#[derive(Debug, Parser)]
#[command(name = "mailrelay-send", about = "Relay a raw email to the configured chat webhook")]
struct Args {
    /// Envelope sender
    #[arg(long)]
    from: String,

    /// Envelope recipient
    #[arg(long)]
    to: String,

    /// Override RELAY_MODE (legacy, plain or embed)
    #[arg(long)]
    mode: Option<RelayMode>,

    /// Raw message file; stdin when omitted
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only the report
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(mode) = args.mode {
        config.relay_mode = mode;
    }

    let raw = match &args.file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    info!(
        from = %args.from,
        to = %args.to,
        raw_length = raw.len(),
        relay_mode = %config.relay_mode,
        "send_starting"
    );

    let relay = Relay::from_config(&config)?;
    let email = InboundEmail::from_raw_bytes(args.from, args.to, &raw);
    let report = relay.handle(&email).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
