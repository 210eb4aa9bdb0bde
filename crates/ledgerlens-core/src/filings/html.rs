//! Visible-text extraction from filing HTML.

use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Elements whose content is never visible text.
const SKIPPED: &[&str] = &["script", "style", "noscript", "head", "title", "svg", "iframe"];

/// Elements that start a new line of text.
const BLOCKS: &[&str] = &[
    "p", "div", "br", "tr", "li", "table", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "body", "hr",
];

/// Extracts visible text from an HTML document.
///
/// Inline elements (spans, fonts, links) are joined into the surrounding line;
/// block elements start new lines. Whitespace runs, including non-breaking
/// spaces, collapse to one space and blank lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut buffer = String::new();
    walk(document.root_element(), &mut buffer);

    buffer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn walk(element: ElementRef<'_>, buffer: &mut String) {
    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return;
    }

    let block = BLOCKS.contains(&name);
    if block {
        buffer.push('\n');
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_collapsed(buffer, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    walk(child, buffer);
                }
            }
            _ => {}
        }
    }

    if block {
        buffer.push('\n');
    } else if matches!(name, "td" | "th") && !buffer.ends_with([' ', '\n']) {
        buffer.push(' ');
    }
}

fn push_collapsed(buffer: &mut String, text: &str) {
    let mut words = text.split_whitespace().peekable();
    if words.peek().is_none() {
        if !text.is_empty() && !buffer.ends_with([' ', '\n']) {
            buffer.push(' ');
        }
        return;
    }

    if text.starts_with(char::is_whitespace) && !buffer.ends_with([' ', '\n']) {
        buffer.push(' ');
    }
    let mut first = true;
    for word in words {
        if !first {
            buffer.push(' ');
        }
        buffer.push_str(word);
        first = false;
    }
    if text.ends_with(char::is_whitespace) {
        buffer.push(' ');
    }
}
