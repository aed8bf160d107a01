// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Screenshot Renamer
//!
//! Renames `Screenshot*.png` files using local OCR, vision-model captions
//! and a text model that proposes a descriptive filename.

pub mod caption;
pub mod config;
pub mod error;
pub mod filename;
pub mod history;
pub mod metadata;
pub mod ocr;
pub mod ollama;
pub mod pipeline;
pub mod progress;
pub mod scan;
pub mod selftest;
pub mod tags;

pub use config::AppConfig;
pub use error::{RenamerError, Result};
pub use tags::{extract_response_text, extract_xml_tag};
