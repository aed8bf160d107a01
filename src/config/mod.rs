// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for the screenshot renamer

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// AI engine configuration
    #[serde(default)]
    pub ai_engine: EngineConfig,

    /// OCR settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Naming rules
    #[serde(default)]
    pub rules: RuleConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Metadata embedding settings
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Rename history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub url: String,
    #[serde(default)]
    pub models: ModelConfig,
    /// Vision models used for captions, in order of preference.
    /// The first one is required, the rest are used when installed.
    #[serde(default = "default_captioners")]
    pub captioners: Vec<CaptionerConfig>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    /// Text model for filename synthesis, or `auto` to pick by system memory
    #[serde(default = "default_text_model")]
    pub text: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptionerConfig {
    pub model: String,
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_tesseract")]
    pub binary: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleConfig {
    #[serde(default = "default_max_stub_length")]
    pub max_stub_length: usize,
    /// Character budget for OCR and caption text inside the filename prompt
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_caption_prompt")]
    pub caption: String,
    #[serde(default = "default_filename_system")]
    pub filename_system: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_exiftool")]
    pub exiftool: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
}

// Default value functions
fn default_engine_url() -> String { "http://localhost:11434".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_retries() -> u32 { 2 }
fn default_text_model() -> String { "auto".to_string() }
fn default_max_dimension() -> u32 { 1024 }
fn default_tesseract() -> String { "tesseract".to_string() }
fn default_ocr_language() -> String { "eng".to_string() }
fn default_max_stub_length() -> usize { 64 }
fn default_max_context_chars() -> usize { 1500 }
fn default_true() -> bool { true }
fn default_exiftool() -> String { "exiftool".to_string() }

fn default_captioners() -> Vec<CaptionerConfig> {
    vec![
        CaptionerConfig { model: "moondream".to_string(), max_dimension: 720 },
        CaptionerConfig { model: "llava:7b".to_string(), max_dimension: 1280 },
    ]
}

fn default_caption_prompt() -> String {
    "Describe this screenshot in one or two sentences. Mention the application, \
     document or subject shown and what the user appears to be doing.".to_string()
}

fn default_filename_system() -> String {
    "You write concise, utilitarian outputs for screenshot filenames. \
     Return only the text requested by the user prompt.".to_string()
}

fn default_history_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("screenshot-renamer").join("history.jsonl"))
        .unwrap_or_else(|| PathBuf::from("screenshot_renamer_history.jsonl"))
        .to_string_lossy()
        .to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            models: ModelConfig::default(),
            captioners: default_captioners(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { text: default_text_model() }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: default_tesseract(),
            language: default_ocr_language(),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_stub_length: default_max_stub_length(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            caption: default_caption_prompt(),
            filename_system: default_filename_system(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exiftool: default_exiftool(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: default_history_path() }
    }
}

impl AppConfig {
    /// Default config location: `<config dir>/screenshot-renamer/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("screenshot-renamer").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::RenamerError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.ai_engine.captioners.is_empty() {
            return Err(crate::RenamerError::Config(
                "At least one captioner model must be configured".to_string(),
            ));
        }
        if self.rules.max_stub_length == 0 {
            return Err(crate::RenamerError::Config(
                "rules.max_stub_length must be greater than zero".to_string(),
            ));
        }
        if self.rules.max_context_chars < 4 {
            return Err(crate::RenamerError::Config(
                "rules.max_context_chars must be at least 4".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ai_engine.models.text, "auto");
        assert_eq!(config.ai_engine.captioners[0].model, "moondream");
        assert_eq!(config.ai_engine.captioners[0].max_dimension, 720);
        assert_eq!(config.rules.max_stub_length, 64);
        assert_eq!(config.rules.max_context_chars, 1500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "ocr": { "language": "deu" }, "rules": { "max_stub_length": 40 } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.binary, "tesseract");
        assert_eq!(config.rules.max_stub_length, 40);
        assert_eq!(config.rules.max_context_chars, 1500);
        assert_eq!(config.ai_engine.retries, 2);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.metadata.exiftool, "exiftool");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.ai_engine.models.text = "phi4:14b-q4_K_M".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.ai_engine.models.text, "phi4:14b-q4_K_M");
        assert_eq!(loaded.ai_engine.captioners, config.ai_engine.captioners);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(AppConfig::load(&path), Err(crate::RenamerError::Config(_))));
    }

    #[test]
    fn test_empty_captioners_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "ai_engine": { "captioners": [] } }"#).unwrap();

        assert!(matches!(AppConfig::load(&path), Err(crate::RenamerError::Config(_))));
    }
}
