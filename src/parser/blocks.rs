use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::charclass::char_len;

static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());
static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s*").unwrap());

/// Headings shorter than this (ordinal stripped) are navigation noise.
pub const MIN_SENTENCE_CHARS: usize = 5;

/// One numbered example: the heading text and the plain-text fragments that
/// follow it up to the next numbered heading.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub ordinal: usize,
    pub heading: String,
    pub fragments: Vec<String>,
}

impl RawBlock {
    pub fn content(&self) -> String {
        self.fragments.join("\n")
    }
}

pub fn split_blocks(html: &str) -> Vec<RawBlock> {
    let doc = Html::parse_document(html);
    let mut blocks = Vec::new();
    let mut ordinal = 0;

    for heading in doc.select(&HEADING_SEL) {
        let text = flatten_text(heading);
        if !ORDINAL_RE.is_match(&text) {
            continue;
        }
        ordinal += 1;

        if char_len(strip_ordinal(&text)) < MIN_SENTENCE_CHARS {
            continue;
        }

        let mut fragments = Vec::new();
        for sibling in heading.next_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                if is_numbered_heading(el) {
                    break;
                }
                let t = flatten_text(el);
                if !t.is_empty() {
                    fragments.push(t);
                }
            } else if let Node::Text(t) = sibling.value() {
                let t = t.trim();
                if !t.is_empty() {
                    fragments.push(t.to_string());
                }
            }
        }

        blocks.push(RawBlock {
            ordinal,
            heading: text,
            fragments,
        });
    }

    blocks
}

/// Remove a leading "12. " ordinal and surrounding whitespace.
pub fn strip_ordinal(text: &str) -> &str {
    match ORDINAL_RE.find(text) {
        Some(m) => text[m.end()..].trim(),
        None => text.trim(),
    }
}

fn is_numbered_heading(el: ElementRef) -> bool {
    el.value().name() == "h2" && ORDINAL_RE.is_match(&flatten_text(el))
}

/// Every descendant text node trimmed and concatenated.
fn flatten_text(el: ElementRef) -> String {
    el.text().map(str::trim).collect()
}
