//! Draft review documents in the layout `cargo crev review` opens in `$EDITOR`.
//!
//! The text is rendered by hand rather than through `serde_yaml` so the
//! output keeps the exact key order and block-literal comment cargo-crev's
//! own template uses.

use serde::Deserialize;

use crate::error::Result;
use crate::models::{ReviewDraft, ReviewScore};

/// Registry every alternative is assumed to come from
pub const CRATES_IO_SOURCE: &str = "https://crates.io";

/// Render a draft as YAML. Identical drafts always render identically.
pub fn serialize_draft(draft: &ReviewDraft) -> String {
    let review = &draft.review;
    let mut out = String::new();

    out.push_str("review:\n");
    out.push_str(&format!("  thoroughness: {}\n", review.thoroughness));
    out.push_str(&format!("  understanding: {}\n", review.understanding));
    out.push_str(&format!("  rating: {}\n", review.rating));

    if draft.alternatives.is_empty() {
        out.push_str("alternatives: []\n");
    } else {
        out.push_str("alternatives:\n");
        for name in &draft.alternatives {
            out.push_str(&format!("  - source: \"{}\"\n", CRATES_IO_SOURCE));
            out.push_str(&format!("    name: {}\n", scalar(name)));
        }
    }

    out.push_str("comment: ");
    out.push_str(&comment_block(&draft.comment));

    out
}

/// Plain crate names go out bare; anything else is double-quoted
fn scalar(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && value.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && !is_keyword(value);
    if plain {
        value.to_string()
    } else {
        quoted(value)
    }
}

/// Words a YAML 1.1 or 1.2 reader would resolve to a bool, null or float
fn is_keyword(value: &str) -> bool {
    const KEYWORDS: [&str; 11] = [
        "true", "false", "null", "yes", "no", "on", "off", "y", "n", "nan", "inf",
    ];
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(value))
}

/// Characters YAML accepts verbatim inside a block literal.
///
/// NEL, LS and PS count as line breaks to YAML, and a BOM is only
/// allowed at the start of a stream.
fn is_block_safe(c: char) -> bool {
    matches!(c,
        '\t' | '\n'
        | '\u{20}'..='\u{7E}'
        | '\u{A0}'..='\u{2027}'
        | '\u{202A}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FEFE}'
        | '\u{FF00}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// A YAML double-quoted scalar, escaping everything outside printable ASCII
/// line content that a reader could reinterpret
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{85}' => out.push_str("\\N"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            c if is_block_safe(c) => out.push(c),
            c if (c as u32) <= 0xFFFF => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push_str(&format!("\\U{:08X}", c as u32)),
        }
    }
    out.push('"');
    out
}

/// Render a comment as a block literal, every line indented by two spaces.
///
/// Chomping follows the text: `|-` when it has no trailing newline, `|+`
/// when it does. An explicit indentation indicator is added when the text
/// starts with whitespace, otherwise YAML would try to read that whitespace
/// as indentation. Text a block literal cannot carry goes out double-quoted.
fn comment_block(comment: &str) -> String {
    if comment.trim().is_empty() || !comment.chars().all(is_block_safe) {
        return format!("{}\n", quoted(comment));
    }

    let mut header = String::from("|");
    if comment.starts_with(char::is_whitespace) {
        header.push('2');
    }
    header.push(if comment.ends_with('\n') { '+' } else { '-' });

    let mut body = String::new();
    for line in comment.split_inclusive('\n') {
        if line != "\n" {
            body.push_str("  ");
        }
        body.push_str(line);
    }
    if !comment.ends_with('\n') {
        body.push('\n');
    }

    format!("{}\n{}", header, body)
}

#[derive(Debug, Deserialize)]
struct DraftDocument {
    review: ReviewScore,
    #[serde(default)]
    alternatives: Option<Vec<Alternative>>,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    name: String,
}

/// Read a draft back from YAML in the layout [`serialize_draft`] writes
pub fn parse_draft(text: &str) -> Result<ReviewDraft> {
    let doc: DraftDocument = serde_yaml::from_str(text)?;

    Ok(ReviewDraft {
        review: doc.review,
        alternatives: doc
            .alternatives
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.name)
            .collect(),
        comment: doc.comment.unwrap_or_default(),
    })
}
