// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for the screenshot renamer

use thiserror::Error;

/// Result type alias for renamer operations
pub type Result<T> = std::result::Result<T, RenamerError>;

/// Renamer error types
#[derive(Error, Debug)]
pub enum RenamerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Ollama not available: {0}")]
    OllamaUnavailable(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Caption error: {0}")]
    Caption(String),

    #[error("Filename generation error: {0}")]
    Generation(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Self-test failed: {0}")]
    SelfTest(String),
}
