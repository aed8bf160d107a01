// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Embedding OCR text and captions into image metadata

use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::{RenamerError, Result};

/// Writes descriptive metadata into an image file
pub trait MetadataWriter: Send + Sync {
    fn write(&self, path: &Path, ocr_text: &str, caption: &str) -> Result<()>;
}

/// Metadata writer backed by the `exiftool` CLI
pub struct ExifTool {
    binary: String,
}

impl ExifTool {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    /// Check if exiftool can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-ver")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn build_args(path: &Path, ocr_text: &str, caption: &str) -> Vec<String> {
        vec![
            "-overwrite_original".to_string(),
            "-q".to_string(),
            format!("-Description={}", caption),
            format!("-UserComment={}", ocr_text),
            path.to_string_lossy().to_string(),
        ]
    }
}

impl MetadataWriter for ExifTool {
    fn write(&self, path: &Path, ocr_text: &str, caption: &str) -> Result<()> {
        debug!("Writing metadata to {:?}", path);

        let output = Command::new(&self.binary)
            .args(Self::build_args(path, ocr_text, caption))
            .output()
            .map_err(|e| RenamerError::Metadata(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(RenamerError::Metadata(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args = ExifTool::build_args(
            Path::new("/tmp/screenshot_2024-05-01-chart.png"),
            "Revenue Q1",
            "A bar chart",
        );
        assert_eq!(args[0], "-overwrite_original");
        assert_eq!(args[2], "-Description=A bar chart");
        assert_eq!(args[3], "-UserComment=Revenue Q1");
        assert_eq!(args[4], "/tmp/screenshot_2024-05-01-chart.png");
    }

    #[test]
    fn test_missing_binary() {
        let tool = ExifTool::new("definitely-not-exiftool");
        assert!(!tool.is_available());
        let result = tool.write(Path::new("shot.png"), "", "");
        assert!(matches!(result, Err(RenamerError::Metadata(_))));
    }
}
