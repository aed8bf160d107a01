// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename history for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::Result;

/// Characters of OCR text kept in a history entry
const OCR_EXCERPT_CHARS: usize = 200;

/// A single rename operation in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub filename_stub: String,
    #[serde(default)]
    pub ocr_excerpt: String,
    #[serde(default)]
    pub caption: String,
    pub file_hash: String,
    #[serde(default)]
    pub undone: bool,
}

/// Outcome of an undo request
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UndoReport {
    /// Renames reverted (or that would be, in a dry run)
    pub undone: Vec<(PathBuf, PathBuf)>,
    /// Entries skipped because a path was missing or occupied
    pub skipped: usize,
}

/// History manager for tracking screenshot renames
pub struct History {
    path: PathBuf,
}

impl History {
    /// Create a new history manager
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all history entries
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Failed to parse history entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark entries as undone
    pub fn mark_undone(&self, ids: &[String]) -> Result<()> {
        let entries = self.read_all()?;

        // Rewrite the entire file with the updated entries
        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if ids.contains(&entry.id) {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Get entries that haven't been undone (oldest first)
    pub fn get_undoable(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().filter(|e| !e.undone).collect())
    }

    /// Revert the `count` most recent renames
    pub fn undo(&self, count: usize, dry_run: bool) -> Result<UndoReport> {
        let entries = self.get_undoable()?;
        let mut report = UndoReport::default();
        let mut reverted_ids = Vec::new();

        for entry in entries.into_iter().rev().take(count) {
            if !entry.new_path.exists() {
                warn!("File not found (may have been moved/deleted): {:?}", entry.new_path);
                report.skipped += 1;
                continue;
            }
            if entry.original_path.exists() {
                warn!("Original path already exists: {:?}", entry.original_path);
                report.skipped += 1;
                continue;
            }

            if !dry_run {
                if let Err(e) = fs::rename(&entry.new_path, &entry.original_path) {
                    warn!("Failed to undo {:?}: {}", entry.new_path, e);
                    report.skipped += 1;
                    continue;
                }
                info!("Undone: {:?} -> {:?}", entry.new_path, entry.original_path);
                reverted_ids.push(entry.id.clone());
            }
            report.undone.push((entry.new_path, entry.original_path));
        }

        if !reverted_ids.is_empty() {
            self.mark_undone(&reverted_ids)?;
        }

        Ok(report)
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get history file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create a new history entry
pub fn create_entry(
    original_path: PathBuf,
    new_path: PathBuf,
    filename_stub: String,
    ocr_text: &str,
    caption: String,
    file_hash: String,
) -> HistoryEntry {
    HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        original_path,
        new_path,
        filename_stub,
        ocr_excerpt: ocr_text.chars().take(OCR_EXCERPT_CHARS).collect(),
        caption,
        file_hash,
        undone: false,
    }
}

/// Hash file contents so a history entry can be matched to its file
pub fn calculate_file_hash(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}
