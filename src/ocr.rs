// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text recognition using the Tesseract CLI

use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::config::OcrConfig;
use crate::{RenamerError, Result};

/// Extracts visible text from an image
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, path: &Path) -> Result<String>;
}

/// OCR backed by a local `tesseract` binary
pub struct TesseractOcr {
    binary: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            language: config.language.clone(),
        }
    }

    /// Check if the tesseract binary can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl TextRecognizer for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, path: &Path) -> Result<String> {
        debug!("Running {} on {:?}", self.binary, path);

        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| RenamerError::Ocr(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(RenamerError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ocr_with_binary(binary: &str) -> TesseractOcr {
        TesseractOcr::new(&OcrConfig {
            binary: binary.to_string(),
            language: "eng".to_string(),
        })
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        assert!(!ocr_with_binary("definitely-not-a-tesseract-binary").is_available());
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let ocr = ocr_with_binary("definitely-not-a-tesseract-binary");
        let result = ocr.recognize(Path::new("shot.png")).await;
        assert!(matches!(result, Err(RenamerError::Ocr(_))));
    }
}
