//! RFC 5322 extraction using mailparse.
//!
//! Pulls the decoded Subject, the `From` mailbox and a readable body out of
//! a raw message. Charsets and transfer encodings are handled by the
//! library, so ISO-2022-JP and friends decode fully here.

use mailparse::{addrparse_header, parse_mail, DispositionType, MailAddr, MailHeaderMap, ParsedMail};
use tracing::{info, warn};

use super::html::html_to_text;

/// Fields pulled from a parsed message.
#[derive(Debug, Default, PartialEq)]
pub struct MimeContent {
    /// Decoded Subject header
    pub subject: Option<String>,
    /// Display name of the From mailbox
    pub sender_name: Option<String>,
    /// Address of the From mailbox
    pub sender_address: Option<String>,
    /// Plain-text body
    pub body: Option<String>,
}

/// Parse raw RFC 5322 content.
pub fn extract(raw: &[u8]) -> Result<MimeContent, mailparse::MailParseError> {
    info!(raw_length = raw.len(), "mime_parse_start");

    let mail = parse_mail(raw)?;

    let subject = mail
        .headers
        .get_first_value("Subject")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let (sender_name, sender_address) = extract_sender(&mail);
    let body = extract_body(&mail);

    info!(
        content_type = %mail.ctype.mimetype,
        has_subject = subject.is_some(),
        has_sender = sender_address.is_some(),
        body_length = body.as_ref().map(|b| b.len()).unwrap_or(0),
        "mime_parse_complete"
    );

    Ok(MimeContent {
        subject,
        sender_name,
        sender_address,
        body,
    })
}

/// Display name and address of the first From mailbox.
fn extract_sender(mail: &ParsedMail) -> (Option<String>, Option<String>) {
    let header = match mail.headers.get_first_header("From") {
        Some(h) => h,
        None => return (None, None),
    };

    let list = match addrparse_header(header) {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "mime_from_parse_failed");
            return (None, None);
        }
    };

    let single = list.iter().find_map(|addr| match addr {
        MailAddr::Single(info) => Some(info.clone()),
        MailAddr::Group(group) => group.addrs.first().cloned(),
    });

    match single {
        Some(info) => (
            info.display_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            Some(info.addr),
        ),
        None => (None, None),
    }
}

/// Readable body: the first text/plain part, else the first text/html part
/// rendered to text.
fn extract_body(mail: &ParsedMail) -> Option<String> {
    if let Some(text) = find_part(mail, "text/plain") {
        return Some(text);
    }

    let html = find_part(mail, "text/html")?;
    info!(html_length = html.len(), "mime_body_from_html");
    let text = html_to_text(&html);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Depth-first search for a non-attachment part of the given type.
fn find_part(mail: &ParsedMail, mimetype: &str) -> Option<String> {
    if mail.subparts.is_empty() {
        if mail.ctype.mimetype != mimetype || is_attachment(mail) {
            return None;
        }
        return extract_body_text(mail);
    }

    mail.subparts
        .iter()
        .find_map(|part| find_part(part, mimetype))
}

fn is_attachment(mail: &ParsedMail) -> bool {
    mail.get_content_disposition().disposition == DispositionType::Attachment
}

/// Extract the trimmed body text from a mail part.
fn extract_body_text(mail: &ParsedMail) -> Option<String> {
    match mail.get_body() {
        Ok(body) => {
            let body = body.trim();
            if body.is_empty() {
                None
            } else {
                Some(body.to_string())
            }
        }
        Err(e) => {
            warn!(error = %e, "mime_body_extraction_failed");
            None
        }
    }
}
