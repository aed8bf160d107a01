// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image captioning using Ollama vision models

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use tracing::debug;

use super::CaptionBackend;
use crate::ollama::OllamaClient;
use crate::{RenamerError, Result};

/// Captioner that sends a downscaled copy of the screenshot to a vision model
pub struct VisionCaptioner {
    client: OllamaClient,
    model: String,
    prompt: String,
    max_dimension: u32,
}

impl VisionCaptioner {
    pub fn new(client: OllamaClient, model: String, prompt: String, max_dimension: u32) -> Self {
        Self {
            client,
            model,
            prompt,
            max_dimension,
        }
    }

    /// Load, flatten to RGB and shrink the image so its longer side is at
    /// most `max_dimension`, then encode it as JPEG
    pub fn prepare_image(path: &Path, max_dimension: u32) -> Result<Vec<u8>> {
        let img = image::open(path)?;
        let img = DynamicImage::ImageRgb8(img.to_rgb8());
        let img = resize_to_fit(img, max_dimension);

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        img.write_to(&mut cursor, image::ImageFormat::Jpeg)?;

        Ok(buffer)
    }
}

/// Shrink so the longer side equals `max_dimension`, keeping the aspect ratio.
/// Images that already fit are returned unchanged.
pub fn resize_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width.max(height) <= max_dimension {
        return img;
    }
    img.resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3)
}

#[async_trait]
impl CaptionBackend for VisionCaptioner {
    fn name(&self) -> &str {
        &self.model
    }

    async fn caption(&self, path: &Path) -> Result<String> {
        let data = Self::prepare_image(path, self.max_dimension)?;
        debug!("Prepared {} byte JPEG for {}", data.len(), self.model);
        let image_data = general_purpose::STANDARD.encode(&data);

        let response = self.client
            .generate_with_image(&self.model, &self.prompt, &image_data)
            .await?;

        let caption = response.trim().to_string();
        if caption.is_empty() {
            return Err(RenamerError::Caption(format!(
                "Caption generation failed for backend '{}'",
                self.model
            )));
        }
        Ok(caption)
    }
}
