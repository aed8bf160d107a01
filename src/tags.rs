// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Pseudo-XML tag extraction for model responses
//!
//! Generative models wrap answers in tags like `<response>` or `<answer>`,
//! but their output is frequently truncated, repeats itself, or varies the
//! tag casing. Both extractors here are tolerant of that: the last
//! occurrence of a tag wins, a missing closing tag is accepted, and a
//! missing tag yields an empty string rather than an error.

use once_cell::sync::Lazy;
use regex::Regex;

static RESPONSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<response[^>]*>(.*?)</response[^>]*>").expect("valid response pattern")
});

/// Extract the content of the last `<tag ...>` in `raw_text`.
///
/// Matching is case-insensitive. If no closing `</tag` follows the opening
/// tag, everything up to the end of the text is returned. The result is
/// trimmed; an empty string means the tag was not found.
pub fn extract_xml_tag(raw_text: &str, tag: &str) -> String {
    if raw_text.is_empty() {
        return String::new();
    }

    // ASCII folding keeps byte offsets aligned with `raw_text`
    let lower = raw_text.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let open_token = format!("<{}", tag);
    let close_token = format!("</{}", tag);

    let start_idx = match lower.rfind(&open_token) {
        Some(idx) => idx,
        None => return String::new(),
    };

    let gt_idx = match raw_text[start_idx..].find('>') {
        Some(offset) => start_idx + offset,
        None => return String::new(),
    };

    let body_start = gt_idx + 1;
    let content = match lower[body_start..].find(&close_token) {
        Some(offset) => &raw_text[body_start..body_start + offset],
        // Truncated output: take the rest of the text
        None => &raw_text[body_start..],
    };

    content.trim().to_string()
}

/// Extract the content of the last `<response>` tag in `raw_text`.
///
/// A closing `</response>` is appended first when the text after the last
/// opening tag does not already end with one, so truncated output still
/// yields its body.
pub fn extract_response_text(raw_text: &str) -> String {
    if raw_text.is_empty() {
        return String::new();
    }

    let start_idx = match raw_text.to_ascii_lowercase().rfind("<response") {
        Some(idx) => idx,
        None => return String::new(),
    };

    let mut after_start = raw_text[start_idx..].to_string();
    if !after_start.trim_end().to_ascii_lowercase().ends_with("</response>") {
        after_start.push_str("</response>");
    }

    RESPONSE_RE
        .captures(&after_start)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
