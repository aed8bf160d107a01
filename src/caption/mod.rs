// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Caption backends and caption payload composition

pub mod vision;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::ollama::{model_in_list, OllamaClient};
use crate::{RenamerError, Result};

pub use vision::VisionCaptioner;

/// Trait for image captioners
#[async_trait]
pub trait CaptionBackend: Send + Sync {
    /// Backend name, used as the caption label
    fn name(&self) -> &str;

    /// Describe the image at `path`
    async fn caption(&self, path: &Path) -> Result<String>;
}

/// A caption produced by one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub backend: String,
    pub text: String,
}

/// All captions for one image, flattened for the filename prompt
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionPayload {
    pub text: String,
    pub model_note: Option<String>,
}

const BLEND_NOTE: &str = "Several caption models described this screenshot. The first caption \
    tends to be richer and more context-aware, the later ones more literal. Blend these \
    perspectives when deciding on the filename.";

/// Combine captions into one labelled block, plus a blending note when
/// more than one backend contributed
pub fn compose_caption_payload(captions: &[Caption]) -> CaptionPayload {
    let mut backends = BTreeSet::new();
    let parts: Vec<String> = captions
        .iter()
        .map(|c| {
            backends.insert(c.backend.as_str());
            let text = c.text.trim();
            let text = if text.is_empty() { "N/A" } else { text };
            format!("{} caption:\n{}", caption_label(&c.backend), text)
        })
        .collect();

    let model_note = if backends.len() > 1 {
        Some(BLEND_NOTE.to_string())
    } else {
        None
    };

    CaptionPayload {
        text: parts.join("\n\n"),
        model_note,
    }
}

/// `llava-phi3` -> `Llava Phi3`
fn caption_label(backend: &str) -> String {
    backend
        .replace('-', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Build the configured caption backends.
///
/// The first configured model must be installed; later ones are skipped
/// with a warning when missing.
pub async fn setup_backends(
    client: &OllamaClient,
    config: &AppConfig,
    prompt_override: Option<&str>,
) -> Result<Vec<Box<dyn CaptionBackend>>> {
    let available = client.list_models().await?;
    let prompt = prompt_override.unwrap_or(&config.prompts.caption).to_string();

    let mut backends: Vec<Box<dyn CaptionBackend>> = Vec::new();
    for (i, captioner) in config.ai_engine.captioners.iter().enumerate() {
        if !model_in_list(&available, &captioner.model) {
            if i == 0 {
                return Err(RenamerError::ModelNotFound(format!(
                    "Caption model '{}' not found locally. Try: ollama pull {}",
                    captioner.model, captioner.model
                )));
            }
            warn!("Caption model '{}' unavailable, skipping", captioner.model);
            continue;
        }
        info!("Caption backend: {} (max {}px)", captioner.model, captioner.max_dimension);
        backends.push(Box::new(VisionCaptioner::new(
            client.clone(),
            captioner.model.clone(),
            prompt.clone(),
            captioner.max_dimension,
        )));
    }

    Ok(backends)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(backend: &str, text: &str) -> Caption {
        Caption {
            backend: backend.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_single_caption_has_no_note() {
        let payload = compose_caption_payload(&[caption("moondream", " A terminal window. ")]);
        assert_eq!(payload.text, "Moondream caption:\nA terminal window.");
        assert!(payload.model_note.is_none());
    }

    #[test]
    fn test_two_backends_add_note() {
        let payload = compose_caption_payload(&[
            caption("moondream", "A spreadsheet of quarterly revenue."),
            caption("llava-phi3", "a table with numbers"),
        ]);
        assert_eq!(
            payload.text,
            "Moondream caption:\nA spreadsheet of quarterly revenue.\n\nLlava Phi3 caption:\na table with numbers"
        );
        assert!(payload.model_note.is_some());
    }

    #[test]
    fn test_empty_caption_is_na() {
        let payload = compose_caption_payload(&[caption("moondream", "   ")]);
        assert_eq!(payload.text, "Moondream caption:\nN/A");
    }

    #[test]
    fn test_same_backend_twice_has_no_note() {
        let payload = compose_caption_payload(&[caption("moondream", "a"), caption("moondream", "b")]);
        assert!(payload.model_note.is_none());
    }

    #[test]
    fn test_caption_label() {
        assert_eq!(caption_label("vit-gpt2"), "Vit Gpt2");
        assert_eq!(caption_label("llava:7b"), "Llava:7b");
    }
}
