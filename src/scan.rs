// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Directory scanning for screenshots that still need a name

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::{RenamerError, Result};

static RENAMED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^screenshot_(\d{4}-\d{2}-\d{2}|unknown-date)-[a-z0-9_-]+\.png$")
        .expect("valid renamed pattern")
});

/// Screenshots found in a directory
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanResult {
    /// File names still to be renamed
    pub pending: Vec<String>,
    /// File names that already follow the renamed pattern
    pub already_renamed: Vec<String>,
}

/// Check if a file name is a screenshot PNG this tool handles
pub fn is_screenshot(filename: &str) -> bool {
    // Skip hidden files and macOS resource forks
    if filename.starts_with('.') {
        return false;
    }

    // macOS filesystems are usually case-insensitive
    let lower = filename.to_lowercase();
    lower.starts_with("screen")
        && Path::new(&lower).extension().and_then(|e| e.to_str()) == Some("png")
}

/// Check if a file name already has the `screenshot_<date>-<stub>.png` form
pub fn is_already_renamed(filename: &str) -> bool {
    RENAMED_RE.is_match(filename)
}

/// Collect screenshot PNGs in `dir`, split into pending and already renamed
pub fn scan_directory(dir: &Path) -> Result<ScanResult> {
    if !dir.is_dir() {
        return Err(RenamerError::Config(format!(
            "The specified path {:?} is not a valid directory",
            dir
        )));
    }

    let mut result = ScanResult::default();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let filename = match entry.file_name().to_str() {
            Some(n) => n.to_string(),
            None => {
                debug!("Skipping non-UTF-8 file name: {:?}", entry.file_name());
                continue;
            }
        };

        if !is_screenshot(&filename) {
            continue;
        }
        if is_already_renamed(&filename) {
            result.already_renamed.push(filename);
        } else {
            result.pending.push(filename);
        }
    }

    result.already_renamed.sort();
    Ok(result)
}

/// Order files for processing: alphabetical, then shortest names first for
/// live runs, or shuffled for dry runs so repeated previews sample
/// different files
pub fn order_for_run(mut files: Vec<String>, dry_run: bool) -> Vec<String> {
    files.sort();
    if dry_run {
        files.sort_by_cached_key(|_| Uuid::new_v4());
    } else {
        files.sort_by_key(|f| f.len());
    }
    files
}
