//! Inbound email event type.
//!
//! The edge email worker posts the SMTP envelope together with the raw
//! RFC 5322 message. Nothing here is persisted; an `InboundEmail` lives for a
//! single request.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Email event delivered by the edge worker (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEmail {
    /// Envelope sender
    #[serde(rename = "from")]
    pub from_field: String,
    /// Envelope recipient
    pub to: String,
    /// Subject as seen by the edge worker, used when the raw message has none
    #[serde(default)]
    pub subject: Option<String>,
    /// Receive time as an RFC 3339 string
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Raw RFC 5322 email bytes (headers + body), `raw_content` on the wire
    #[serde(rename = "raw_content", with = "raw_text")]
    pub raw: Vec<u8>,
}

impl InboundEmail {
    /// Build an event from raw message bytes. The bytes are kept as given.
    pub fn from_raw_bytes(from: impl Into<String>, to: impl Into<String>, raw: &[u8]) -> Self {
        Self {
            from_field: from.into(),
            to: to.into(),
            subject: None,
            timestamp: None,
            raw: raw.to_vec(),
        }
    }

    /// Raw message as text; invalid UTF-8 sequences are replaced.
    pub fn raw_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }
}

/// JSON carries the raw message as a string.
mod raw_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(raw: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(raw))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_email_deserialization() {
        let json = r#"{
            "from": "sender@example.com",
            "to": "inbox@example.com",
            "subject": "Hello",
            "timestamp": "2024-01-01T00:00:00Z",
            "raw_content": "Subject: Hello\r\n\r\nBody"
        }"#;

        let email: InboundEmail = serde_json::from_str(json).unwrap();
        assert_eq!(email.from_field, "sender@example.com");
        assert_eq!(email.to, "inbox@example.com");
        assert_eq!(email.subject.as_deref(), Some("Hello"));
        assert_eq!(email.raw, b"Subject: Hello\r\n\r\nBody");
    }

    #[test]
    fn test_inbound_email_deserialization_minimal() {
        let json = r#"{"from": "a@example.com", "to": "b@example.com", "raw_content": ""}"#;

        let email: InboundEmail = serde_json::from_str(json).unwrap();
        assert_eq!(email.subject, None);
        assert_eq!(email.timestamp, None);
        assert!(email.raw.is_empty());
    }

    #[test]
    fn test_from_raw_bytes_keeps_bytes() {
        let email = InboundEmail::from_raw_bytes("a@example.com", "b@example.com", b"ok \xff");

        assert_eq!(email.raw, b"ok \xff");
        assert_eq!(email.raw_text(), "ok \u{fffd}");
    }

    #[test]
    fn test_inbound_email_serializes_raw_content_as_string() {
        let email = InboundEmail::from_raw_bytes("a@example.com", "b@example.com", b"Subject: x");

        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(json["raw_content"], "Subject: x");
    }
}
