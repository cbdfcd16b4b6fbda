//! Email content extraction.
//!
//! Turns an [`InboundEmail`] into the subject, body and sender shown in the
//! chat message. Two extractors exist:
//!
//! - [`legacy`]: hand-rolled header/body splitter and transfer decoders
//! - [`mime`]: full parsing through mailparse
//!
//! ```text
//! InboundEmail → extract() → ExtractedEmail
//! ```

pub mod html;
pub mod legacy;
pub mod mime;

use tracing::{info, warn};

use crate::config::RelayMode;
use crate::inbound::InboundEmail;

/// Subject shown when the message has none.
pub const NO_SUBJECT: &str = "件名なし";

/// Body shown when the message has none.
pub const NO_BODY: &str = "本文なし";

/// Sender shown when neither the From header nor the envelope names one.
pub const UNKNOWN_SENDER: &str = "送信元不明";

/// Human-readable content of an email.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEmail {
    pub subject: Option<String>,
    pub body: Option<String>,
    /// Display name of the sender, when the From header carries one
    pub sender_name: Option<String>,
    /// Sender address, the envelope sender when no From header is usable
    pub sender_address: String,
}

impl ExtractedEmail {
    /// Subject with the fallback applied.
    pub fn subject_or_default(&self) -> &str {
        self.subject.as_deref().unwrap_or(NO_SUBJECT)
    }

    /// Body with the fallback applied.
    pub fn body_or_default(&self) -> &str {
        self.body.as_deref().unwrap_or(NO_BODY)
    }

    /// Name to show for the sender, never empty.
    pub fn sender_label(&self) -> &str {
        [self.sender_name.as_deref(), Some(self.sender_address.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|label| !label.is_empty())
            .unwrap_or(UNKNOWN_SENDER)
    }
}

/// Extract content from an inbound email using the extractor for `mode`.
///
/// Never fails: unparsable input yields missing fields, which render as the
/// fallback defaults.
pub fn extract(email: &InboundEmail, mode: RelayMode) -> ExtractedEmail {
    info!(
        mode = %mode,
        from = %email.from_field,
        to = %email.to,
        raw_length = email.raw.len(),
        "extract_start"
    );

    let hinted_subject = non_empty(email.subject.clone());

    let extracted = if mode.uses_mime_parser() {
        match mime::extract(&email.raw) {
            Ok(content) => ExtractedEmail {
                subject: content.subject.or(hinted_subject),
                body: content.body,
                sender_name: content.sender_name,
                sender_address: content
                    .sender_address
                    .unwrap_or_else(|| email.from_field.clone()),
            },
            Err(e) => {
                warn!(error = %e, "extract_mime_parse_failed");
                ExtractedEmail {
                    subject: hinted_subject,
                    body: None,
                    sender_name: None,
                    sender_address: email.from_field.clone(),
                }
            }
        }
    } else {
        let raw = email.raw_text();
        ExtractedEmail {
            subject: legacy_subject(&raw).or(hinted_subject),
            body: non_empty(Some(legacy::extract_body(&raw))),
            sender_name: None,
            sender_address: email.from_field.clone(),
        }
    };

    info!(
        has_subject = extracted.subject.is_some(),
        has_body = extracted.body.is_some(),
        sender = %extracted.sender_address,
        "extract_complete"
    );

    extracted
}

/// Raw value of the first Subject header, unfolded but otherwise undecoded.
fn legacy_subject(raw: &str) -> Option<String> {
    let header = raw.split("\r\n\r\n").next().unwrap_or("");
    let mut lines = header.split("\r\n").peekable();

    while let Some(line) = lines.next() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.eq_ignore_ascii_case("subject") {
            continue;
        }

        // Continuation lines start with whitespace
        let mut unfolded = value.to_string();
        while let Some(next) =
            lines.next_if(|l| l.starts_with(|c: char| c == ' ' || c == '\t'))
        {
            unfolded.push_str(next);
        }
        return non_empty(Some(unfolded.trim().to_string()));
    }

    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
