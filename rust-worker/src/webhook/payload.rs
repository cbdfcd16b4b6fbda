//! Chat webhook message formats.
//!
//! Field names and length limits follow Discord's execute-webhook API.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::extract::ExtractedEmail;
use crate::inbound::InboundEmail;

/// Maximum length of `content`.
pub const CONTENT_LIMIT: usize = 2000;
/// Maximum length of `username`.
pub const USERNAME_LIMIT: usize = 80;
/// Maximum length of an embed title or author name.
pub const TITLE_LIMIT: usize = 256;
/// Maximum length of an embed description.
pub const DESCRIPTION_LIMIT: usize = 4096;
/// Maximum length of an embed field value.
pub const FIELD_VALUE_LIMIT: usize = 1024;

/// Embed accent colour.
const EMBED_COLOR: u32 = 0x5865F2;

lazy_static! {
    /// Words Discord refuses inside a webhook username.
    static ref RESERVED_USERNAME_WORD: Regex = Regex::new(r"(?i)discord|clyde").unwrap();
}

/// Body of a webhook POST.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Email text must never ping anyone.
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub author: EmbedAuthor,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Build a single text message listing sender, recipient, subject and body.
pub fn build_plain(email: &InboundEmail, extracted: &ExtractedEmail) -> WebhookPayload {
    let content = format!(
        "送信元:{}\n宛先:{}\n件名:{}\n\n{}",
        email.from_field,
        email.to,
        extracted.subject_or_default(),
        extracted.body_or_default()
    );

    WebhookPayload {
        content: Some(truncate(&content, CONTENT_LIMIT)),
        ..Default::default()
    }
}

/// Build an embed message posted under the sender's name and avatar.
pub fn build_embed(email: &InboundEmail, extracted: &ExtractedEmail) -> WebhookPayload {
    let avatar = gravatar_url(&extracted.sender_address);
    let address = extracted.sender_address.trim();
    let display_name = extracted
        .sender_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let author = match display_name {
        Some(name) if !address.is_empty() => format!("{} <{}>", name, address),
        _ => extracted.sender_label().to_string(),
    };

    let embed = Embed {
        title: truncate(extracted.subject_or_default(), TITLE_LIMIT),
        description: truncate(extracted.body_or_default(), DESCRIPTION_LIMIT),
        color: EMBED_COLOR,
        author: EmbedAuthor {
            name: truncate(&author, TITLE_LIMIT),
            icon_url: avatar.clone(),
        },
        fields: vec![
            EmbedField {
                name: "送信元".to_string(),
                value: truncate(or_placeholder(&email.from_field), FIELD_VALUE_LIMIT),
                inline: true,
            },
            EmbedField {
                name: "宛先".to_string(),
                value: truncate(or_placeholder(&email.to), FIELD_VALUE_LIMIT),
                inline: true,
            },
        ],
        timestamp: email.timestamp.clone().filter(|t| !t.trim().is_empty()),
    };

    WebhookPayload {
        username: Some(webhook_username(extracted.sender_label())),
        avatar_url: Some(avatar),
        embeds: vec![embed],
        ..Default::default()
    }
}

/// Gravatar URL for an address, identicon when none is registered.
pub fn gravatar_url(address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(address.trim().to_lowercase().as_bytes());
    let hash = hex::encode(hasher.finalize());
    format!("https://gravatar.com/avatar/{}?d=identicon", hash)
}

/// Username accepted by Discord: reserved words masked, length capped.
pub fn webhook_username(label: &str) -> String {
    let masked = RESERVED_USERNAME_WORD.replace_all(label, |caps: &Captures| mask_word(&caps[0]));
    truncate(&masked, USERNAME_LIMIT)
}

/// Keep the first and last character, star out the rest.
fn mask_word(word: &str) -> String {
    let count = word.chars().count();
    word.chars()
        .enumerate()
        .map(|(i, c)| if i == 0 || i + 1 == count { c } else { '*' })
        .collect()
}

/// Cut `text` to at most `limit` characters, marking the cut with `…`.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::UNKNOWN_SENDER;

    fn inbound() -> InboundEmail {
        InboundEmail {
            from_field: "bounce@example.com".to_string(),
            to: "inbox@example.com".to_string(),
            subject: None,
            timestamp: Some("2024-01-01T00:00:00Z".to_string()),
            raw: Vec::new(),
        }
    }

    fn extracted(subject: Option<&str>, body: Option<&str>) -> ExtractedEmail {
        ExtractedEmail {
            subject: subject.map(str::to_string),
            body: body.map(str::to_string),
            sender_name: Some("Dana".to_string()),
            sender_address: "Dana@Example.com".to_string(),
        }
    }

    #[test]
    fn test_build_plain_format() {
        let payload = build_plain(&inbound(), &extracted(Some("Hello"), Some("Body")));

        assert_eq!(
            payload.content.as_deref(),
            Some("送信元:bounce@example.com\n宛先:inbox@example.com\n件名:Hello\n\nBody")
        );
        assert!(payload.embeds.is_empty());
    }

    #[test]
    fn test_build_plain_defaults() {
        let payload = build_plain(&inbound(), &extracted(None, None));

        let content = payload.content.unwrap();
        assert!(content.contains("件名:件名なし"));
        assert!(content.ends_with("本文なし"));
    }

    #[test]
    fn test_build_plain_truncates_content() {
        let long = "あ".repeat(3000);
        let payload = build_plain(&inbound(), &extracted(Some("Long"), Some(&long)));

        let content = payload.content.unwrap();
        assert_eq!(content.chars().count(), CONTENT_LIMIT);
        assert!(content.ends_with('…'));
    }

    #[test]
    fn test_build_embed() {
        let payload = build_embed(&inbound(), &extracted(Some("Hello"), Some("Body")));

        assert_eq!(payload.content, None);
        assert_eq!(payload.username.as_deref(), Some("Dana"));
        assert_eq!(payload.embeds.len(), 1);

        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "Hello");
        assert_eq!(embed.description, "Body");
        assert_eq!(embed.author.name, "Dana <Dana@Example.com>");
        assert_eq!(Some(&embed.author.icon_url), payload.avatar_url.as_ref());
        assert_eq!(embed.fields[1].value, "inbox@example.com");
        assert_eq!(embed.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_build_embed_defaults() {
        let payload = build_embed(&inbound(), &extracted(None, None));

        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "件名なし");
        assert_eq!(embed.description, "本文なし");
    }

    #[test]
    fn test_gravatar_url_normalizes_address() {
        let a = gravatar_url("  Dana@Example.com ");
        let b = gravatar_url("dana@example.com");
        assert_eq!(a, b);
        assert!(a.starts_with("https://gravatar.com/avatar/"));
        assert!(a.ends_with("?d=identicon"));
        // sha256 hex digest
        let hash = &a["https://gravatar.com/avatar/".len()..a.len() - "?d=identicon".len()];
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly", 7), "exactly");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("日本語テキスト", 3), "日本…");
    }

    #[test]
    fn test_payload_serialization_skips_empty_fields() {
        let payload = build_plain(&inbound(), &extracted(Some("s"), Some("b")));

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("content").is_some());
        assert!(json.get("embeds").is_none());
        assert!(json.get("username").is_none());
        assert_eq!(json["allowed_mentions"]["parse"], serde_json::json!([]));
    }

    #[test]
    fn test_build_embed_unknown_sender() {
        let mut email = inbound();
        email.from_field = String::new();
        let anonymous = ExtractedEmail {
            subject: Some("hi".to_string()),
            body: Some("body".to_string()),
            sender_name: None,
            sender_address: String::new(),
        };

        let payload = build_embed(&email, &anonymous);

        assert_eq!(payload.username.as_deref(), Some(UNKNOWN_SENDER));
        assert_eq!(payload.embeds[0].author.name, UNKNOWN_SENDER);
        assert_eq!(payload.embeds[0].fields[0].value, "-");
    }

    #[test]
    fn test_build_embed_name_without_address() {
        let named = ExtractedEmail {
            subject: None,
            body: None,
            sender_name: Some("Dana".to_string()),
            sender_address: String::new(),
        };

        let payload = build_embed(&inbound(), &named);

        assert_eq!(payload.embeds[0].author.name, "Dana");
    }

    #[test]
    fn test_webhook_username_masks_reserved_words() {
        assert_eq!(webhook_username("Discord Support"), "D*****d Support");
        assert_eq!(webhook_username("noreply@discord.com"), "noreply@d*****d.com");
        assert_eq!(webhook_username("CLYDE"), "C***E");
        assert_eq!(webhook_username("Dana"), "Dana");
    }

    #[test]
    fn test_build_embed_masks_reserved_username() {
        let mut sender = extracted(Some("s"), Some("b"));
        sender.sender_name = Some("Discord".to_string());
        sender.sender_address = "noreply@discord.com".to_string();

        let payload = build_embed(&inbound(), &sender);

        let username = payload.username.unwrap();
        assert!(!username.to_lowercase().contains("discord"));
        assert_eq!(username, "D*****d");
        // author names are not restricted
        assert_eq!(payload.embeds[0].author.name, "Discord <noreply@discord.com>");
    }

    #[test]
    fn test_webhook_username_truncates() {
        let long = "x".repeat(200);
        assert_eq!(webhook_username(&long).chars().count(), USERNAME_LIMIT);
    }
}
