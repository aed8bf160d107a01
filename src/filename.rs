// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Filename synthesis from OCR text and captions

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::caption::CaptionPayload;
use crate::ollama::TextGenerator;
use crate::tags::extract_response_text;
use crate::{RenamerError, Result};

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid date pattern"));

/// Placeholder date for screenshots whose name carries none
pub const UNKNOWN_DATE: &str = "unknown-date";

const RULES: &[&str] = &[
    "You are an assistant that writes helpful filenames for macOS screenshots.",
    "Filenames should describe the purpose or category of the screenshot so a user immediately understands why it matters.",
    "Never narrate every visible attribute; capture the intent.",
    "Generate a single snake_case filename (max 64 characters) and output only the filename.",
    "Rules:",
    "- Focus on themes (project, document type, meeting, UI, etc.). Summarize instead of listing all words.",
    "- When people appear, avoid physical descriptors (age, gender, clothing, expressions) unless essential to the function. Prefer neutral terms like portrait, headshot, group_photo.",
    "- Limit people-related filenames to two descriptive concepts plus a generic human term (e.g., leadership_team_headshot, birthday_event_group_photo).",
    "- If the image is simply a person with no clear context, use a neutral fallback such as portrait_photo or group_photo.",
    "- Avoid redundant words like screenshot/macOS/date references.",
    "- No punctuation besides underscores; no file extension in the output.",
    "- When in doubt, choose the shorter, more general filename.",
];

/// Trim `text` to at most `limit` characters, marking the cut with `...`
pub fn truncate_context(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "N/A".to_string();
    }
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}

/// Assemble the filename prompt
pub fn build_prompt(ocr_text: &str, payload: &CaptionPayload, context_limit: usize) -> String {
    let mut sections = vec![RULES.join("\n")];
    sections.push(
        "Context summary:\n\
         Use the information below to infer the screenshot's purpose. \
         Prioritize themes over literal text so the filename reflects what the screenshot is about."
            .to_string(),
    );
    sections.push(format!("OCR Text:\n{}", truncate_context(ocr_text, context_limit)));
    if let Some(note) = &payload.model_note {
        sections.push(note.clone());
    }
    sections.push(format!(
        "Caption Intelligence:\n{}",
        truncate_context(&payload.text, context_limit)
    ));
    sections.push("Wrap the filename in <response></response> tags.".to_string());
    sections.push("Filename:".to_string());
    sections.join("\n\n")
}

/// Turn a model response into a filename stub ending in `.png`.
///
/// The body is limited to `[a-z0-9_-]` so renamed files are recognized
/// by the scanner on later runs.
pub fn sanitize_stub(response: &str, max_len: usize) -> String {
    let first_line = response.trim().lines().next().unwrap_or("").trim().to_lowercase();
    let body = first_line.strip_suffix(".png").unwrap_or(&first_line);
    let replaced = body.replace(' ', "_").replace("__", "_");
    let mut stub: String = replaced
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .take(max_len)
        .collect();

    if stub.is_empty() {
        stub = "untitled".to_string();
    }
    stub.push_str(".png");
    stub
}

/// Ask the text model for a filename stub
pub async fn generate_stub(
    model: &dyn TextGenerator,
    ocr_text: &str,
    payload: &CaptionPayload,
    context_limit: usize,
    max_len: usize,
) -> Result<String> {
    let prompt = build_prompt(ocr_text, payload, context_limit);
    let raw = model.generate(&prompt).await?;
    debug!("Filename model raw response: {:?}", raw);

    let tagged = extract_response_text(&raw);
    let answer = if tagged.is_empty() { raw.trim() } else { tagged.as_str() };
    if answer.is_empty() {
        return Err(RenamerError::Generation(format!(
            "{} returned an empty response",
            model.name()
        )));
    }

    Ok(sanitize_stub(answer, max_len))
}

/// First `YYYY-MM-DD` in the original filename, or `unknown-date`
pub fn extract_date(filename: &str) -> String {
    DATE_RE
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// `screenshot_<date>-<stub>`
pub fn final_filename(date_part: &str, stub: &str) -> String {
    format!("screenshot_{}-{}", date_part, stub)
}
