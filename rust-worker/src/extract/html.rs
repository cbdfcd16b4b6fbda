//! HTML to plain text conversion for messages without a text/plain part.

use scraper::{Html, Node};
use tracing::debug;

/// Elements whose text is never shown to a reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "head", "title"];

/// Elements that start a new line when rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "br", "p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre",
    "table", "ul", "ol", "hr",
];

/// Render an HTML document as plain text.
///
/// Whitespace inside text runs is collapsed, block elements start new lines
/// and runs of blank lines are squeezed to one.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(element) => {
                if BLOCK_ELEMENTS.contains(&element.name()) && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                        .unwrap_or(false)
                });
                if hidden {
                    continue;
                }

                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if collapsed.is_empty() {
                    continue;
                }
                if !out.is_empty() && !out.ends_with(char::is_whitespace) {
                    out.push(' ');
                }
                out.push_str(&collapsed);
            }
            _ => {}
        }
    }

    let text = squeeze_blank_lines(&out);
    debug!(html_length = html.len(), text_length = text.len(), "html_to_text");
    text
}

fn squeeze_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && lines.last().map(|l| l.is_empty()).unwrap_or(true) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}
