// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-screenshot processing and batch runs

use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::caption::{compose_caption_payload, Caption, CaptionBackend};
use crate::filename::{extract_date, final_filename, generate_stub};
use crate::history::{calculate_file_hash, create_entry, History};
use crate::metadata::MetadataWriter;
use crate::ocr::TextRecognizer;
use crate::ollama::TextGenerator;
use crate::progress::{clock_after, format_duration, format_preview, RunStats};
use crate::scan::{order_for_run, scan_directory};
use crate::{RenamerError, Result};

/// Files listed by name in the plan before the rest are summarized
const PLAN_LISTING_LIMIT: usize = 9;

/// Knobs for a renaming run
#[derive(Debug, Clone)]
pub struct RenamerOptions {
    pub dry_run: bool,
    pub max_stub_length: usize,
    pub max_context_chars: usize,
}

impl Default for RenamerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_stub_length: 64,
            max_context_chars: 1500,
        }
    }
}

/// What happened to one screenshot
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub date: String,
    pub ocr_text: String,
    pub captions: Vec<Caption>,
    pub filename_stub: String,
    pub ocr_secs: f64,
    pub caption_secs: f64,
    pub filename_secs: f64,
    /// False for dry runs
    pub renamed: bool,
}

/// Screenshot renaming pipeline: OCR, captions, filename, rename
pub struct Renamer {
    recognizer: Box<dyn TextRecognizer>,
    captioners: Vec<Box<dyn CaptionBackend>>,
    text_model: Box<dyn TextGenerator>,
    metadata: Option<Box<dyn MetadataWriter>>,
    history: Option<History>,
    options: RenamerOptions,
}

impl Renamer {
    pub fn new(
        recognizer: Box<dyn TextRecognizer>,
        captioners: Vec<Box<dyn CaptionBackend>>,
        text_model: Box<dyn TextGenerator>,
        options: RenamerOptions,
    ) -> Result<Self> {
        if captioners.is_empty() {
            return Err(RenamerError::Config("No caption backends available".to_string()));
        }
        Ok(Self {
            recognizer,
            captioners,
            text_model,
            metadata: None,
            history: None,
            options,
        })
    }

    pub fn with_metadata(mut self, writer: Box<dyn MetadataWriter>) -> Self {
        self.metadata = Some(writer);
        self
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn captioner_names(&self) -> Vec<&str> {
        self.captioners.iter().map(|c| c.name()).collect()
    }

    /// Process a single screenshot
    pub async fn process_image(&self, path: &Path) -> Result<ProcessOutcome> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RenamerError::Config(format!("Invalid file name: {:?}", path)))?;
        let parent = path
            .parent()
            .ok_or_else(|| RenamerError::Config("Cannot determine parent directory".to_string()))?;

        info!("Processing image: {}", filename);

        let start = Instant::now();
        let ocr_text = self.recognizer.recognize(path).await?;
        let ocr_secs = start.elapsed().as_secs_f64();
        info!("OCR results ({:.2}s):\n{}", ocr_secs, format_preview(&ocr_text, 2, 80));

        let start = Instant::now();
        let mut captions = Vec::with_capacity(self.captioners.len());
        for (i, captioner) in self.captioners.iter().enumerate() {
            let caption_start = Instant::now();
            match captioner.caption(path).await {
                Ok(text) => {
                    info!(
                        "Caption from {} ({:.2}s):\n{}",
                        captioner.name(),
                        caption_start.elapsed().as_secs_f64(),
                        format_preview(&text, 2, 80)
                    );
                    captions.push(Caption {
                        backend: captioner.name().to_string(),
                        text,
                    });
                }
                Err(e) if i > 0 => {
                    warn!("Secondary caption from {} failed: {}", captioner.name(), e);
                }
                Err(e) => return Err(e),
            }
        }
        let caption_secs = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let payload = compose_caption_payload(&captions);
        let stub = generate_stub(
            self.text_model.as_ref(),
            &ocr_text,
            &payload,
            self.options.max_context_chars,
            self.options.max_stub_length,
        )
        .await?;
        let filename_secs = start.elapsed().as_secs_f64();
        info!("AI filename: {} ({:.2}s)", stub, filename_secs);

        let date = extract_date(filename);
        let new_path = available_path(parent, &final_filename(&date, &stub));
        let new_name = new_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let primary_caption = captions.first().map(|c| c.text.clone()).unwrap_or_default();

        if self.options.dry_run {
            info!("Dry run: would rename '{}' -> '{}'", filename, new_name);
        } else {
            let start = Instant::now();
            // Hash before renaming so a read failure leaves the file in place
            let file_hash = match &self.history {
                Some(_) => Some(calculate_file_hash(path)?),
                None => None,
            };
            std::fs::rename(path, &new_path)?;

            if let Some(writer) = &self.metadata {
                if let Err(e) = writer.write(&new_path, &ocr_text, &primary_caption) {
                    warn!("Failed to write metadata to {:?}: {}", new_path, e);
                }
            }

            if let (Some(history), Some(file_hash)) = (&self.history, file_hash) {
                let entry = create_entry(
                    path.to_path_buf(),
                    new_path.clone(),
                    stub.clone(),
                    &ocr_text,
                    primary_caption,
                    file_hash,
                );
                if let Err(e) = history.append(&entry) {
                    warn!("Failed to record history for {:?}: {}", new_path, e);
                }
            }

            info!(
                "Renamed and updated metadata: '{}' -> '{}' ({:.2}s)",
                filename,
                new_name,
                start.elapsed().as_secs_f64()
            );
        }

        Ok(ProcessOutcome {
            original_path: path.to_path_buf(),
            new_path,
            date,
            ocr_text,
            captions,
            filename_stub: stub,
            ocr_secs,
            caption_secs,
            filename_secs,
            renamed: !self.options.dry_run,
        })
    }

    /// Rename every pending screenshot in `dir`
    pub async fn run(&self, dir: &Path) -> Result<Vec<ProcessOutcome>> {
        let scan = scan_directory(dir)?;

        if scan.pending.is_empty() {
            if scan.already_renamed.is_empty() {
                warn!("No images found in the specified directory.");
            } else {
                warn!("Only already-renamed screenshots found; nothing to do.");
            }
            return Ok(Vec::new());
        }

        let files = order_for_run(scan.pending, self.options.dry_run);
        let total = files.len();

        for (i, name) in files.iter().enumerate().take(PLAN_LISTING_LIMIT) {
            info!("{}: {}", i + 1, name);
        }
        if total > PLAN_LISTING_LIMIT {
            info!("... plus {} more files", total - PLAN_LISTING_LIMIT);
        }

        let mode = if self.options.dry_run { "Dry run (no changes)" } else { "Live rename" };
        let mut summary = format!("Plan summary: Found {} screenshots in {:?}.", total, dir);
        if !scan.already_renamed.is_empty() {
            summary.push_str(&format!(
                " Skipping {} already renamed files.",
                scan.already_renamed.len()
            ));
        }
        info!("{} {}.", summary, mode);

        let mut stats = RunStats::new();
        let mut outcomes = Vec::with_capacity(total);

        for (i, name) in files.iter().enumerate() {
            let index = i + 1;
            info!("Processing image {} of {}", index, total);

            let started = Instant::now();
            match self.process_image(&dir.join(name)).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Failed to process {:?}: {}", name, e),
            }
            let elapsed = started.elapsed();
            stats.record(elapsed);

            info!(
                "Image {} completed in {} (avg {}).",
                index,
                format_duration(elapsed.as_secs_f64()),
                format_duration(stats.average_secs())
            );

            let remaining = total - index;
            if remaining > 0 {
                let eta = stats.eta_secs(remaining);
                info!(
                    "Estimated completion in {} (~{}).",
                    format_duration(eta),
                    clock_after(Local::now(), eta)
                );
            }
        }

        info!(
            "Completed {} images in {} (avg {}); {} succeeded.",
            stats.count(),
            format_duration(stats.total_secs()),
            format_duration(stats.average_secs()),
            outcomes.len()
        );

        Ok(outcomes)
    }
}

/// `dir/name`, or a timestamped variant when that path is taken
pub fn available_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = name.strip_suffix(".png").unwrap_or(name);
    let timestamp = Local::now().format("%H%M%S").to_string();
    let mut attempt = 0u32;
    loop {
        let suffix = if attempt == 0 {
            timestamp.clone()
        } else {
            format!("{}_{}", timestamp, attempt)
        };
        let candidate = dir.join(format!("{}_{}.png", stem, suffix));
        if !candidate.exists() {
            debug!("Name collision for {}, using {:?}", name, candidate);
            return candidate;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FakeOcr(&'static str);

    #[async_trait]
    impl TextRecognizer for FakeOcr {
        fn name(&self) -> &str {
            "fake-ocr"
        }

        async fn recognize(&self, _path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FakeCaptioner {
        name: &'static str,
        text: Option<&'static str>,
    }

    #[async_trait]
    impl CaptionBackend for FakeCaptioner {
        fn name(&self) -> &str {
            self.name
        }

        async fn caption(&self, _path: &Path) -> Result<String> {
            self.text
                .map(String::from)
                .ok_or_else(|| RenamerError::Caption(format!("{} failed", self.name)))
        }
    }

    struct FakeModel {
        response: &'static str,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TextGenerator for FakeModel {
        fn name(&self) -> &str {
            "fake-llm"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.to_string())
        }
    }

    #[derive(Default, Clone)]
    struct RecordingWriter {
        writes: Arc<Mutex<Vec<(PathBuf, String, String)>>>,
    }

    impl MetadataWriter for RecordingWriter {
        fn write(&self, path: &Path, ocr_text: &str, caption: &str) -> Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push((path.to_path_buf(), ocr_text.to_string(), caption.to_string()));
            Ok(())
        }
    }

    fn renamer(
        captioners: Vec<Box<dyn CaptionBackend>>,
        response: &'static str,
        dry_run: bool,
    ) -> (Renamer, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let model = FakeModel { response, prompts: prompts.clone() };
        let options = RenamerOptions { dry_run, ..RenamerOptions::default() };
        let renamer = Renamer::new(
            Box::new(FakeOcr("cargo build\nerror[E0308]: mismatched types")),
            captioners,
            Box::new(model),
            options,
        )
        .unwrap();
        (renamer, prompts)
    }

    fn moondream() -> Box<dyn CaptionBackend> {
        Box::new(FakeCaptioner { name: "moondream", text: Some("A terminal showing a Rust compile error.") })
    }

    #[tokio::test]
    async fn test_process_image_renames_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("Screenshot 2024-05-01 at 10.22.13.png");
        std::fs::write(&shot, b"png bytes").unwrap();

        let writer = RecordingWriter::default();
        let history_path = dir.path().join("history.jsonl");
        let (renamer, prompts) = renamer(vec![moondream()], "<response>rust_type_mismatch_error</response>", false);
        let renamer = renamer
            .with_metadata(Box::new(writer.clone()))
            .with_history(History::new(history_path.clone()));

        let outcome = renamer.process_image(&shot).await.unwrap();

        let expected = dir.path().join("screenshot_2024-05-01-rust_type_mismatch_error.png");
        assert_eq!(outcome.new_path, expected);
        assert!(outcome.renamed);
        assert!(expected.exists());
        assert!(!shot.exists());

        let writes = writer.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, expected);
        assert_eq!(writes[0].2, "A terminal showing a Rust compile error.");

        let entries = History::new(history_path).read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_path, shot);
        assert_eq!(entries[0].file_hash, blake3::hash(b"png bytes").to_hex().to_string());

        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains("error[E0308]"));
        assert!(prompts[0].contains("Moondream caption:"));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("Screenshot 2024-05-01 at 10.22.13.png");
        std::fs::write(&shot, b"png").unwrap();

        let (renamer, _) = renamer(vec![moondream()], "compile_error", true);
        let outcome = renamer.process_image(&shot).await.unwrap();

        assert!(!outcome.renamed);
        assert!(shot.exists());
        assert!(!outcome.new_path.exists());
        assert_eq!(outcome.filename_stub, "compile_error.png");
    }

    #[tokio::test]
    async fn test_unknown_date_and_secondary_failure() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("Screen Shot.png");
        std::fs::write(&shot, b"png").unwrap();

        let failing = Box::new(FakeCaptioner { name: "llava", text: None });
        let (renamer, prompts) = renamer(vec![moondream(), failing], "editor_view", false);
        let outcome = renamer.process_image(&shot).await.unwrap();

        assert_eq!(outcome.date, "unknown-date");
        assert_eq!(outcome.captions.len(), 1);
        assert_eq!(
            outcome.new_path.file_name().unwrap(),
            "screenshot_unknown-date-editor_view.png"
        );
        assert!(!prompts.lock().unwrap()[0].contains("Blend"));
    }

    #[tokio::test]
    async fn test_two_captions_feed_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("Screenshot 2024-06-02.png");
        std::fs::write(&shot, b"png").unwrap();

        let second = Box::new(FakeCaptioner { name: "llava", text: Some("a black window with text") });
        let (renamer, prompts) = renamer(vec![moondream(), second], "terminal_error", true);
        let outcome = renamer.process_image(&shot).await.unwrap();

        assert_eq!(outcome.captions.len(), 2);
        let prompt = &prompts.lock().unwrap()[0];
        assert!(prompt.contains("Llava caption:\na black window with text"));
        assert!(prompt.contains("Blend these perspectives"));
    }

    #[tokio::test]
    async fn test_primary_caption_failure_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("Screenshot 2024-06-02.png");
        std::fs::write(&shot, b"png").unwrap();

        let failing = Box::new(FakeCaptioner { name: "moondream", text: None });
        let (renamer, _) = renamer(vec![failing], "unused", false);
        assert!(matches!(renamer.process_image(&shot).await, Err(RenamerError::Caption(_))));
        assert!(shot.exists());
    }

    #[tokio::test]
    async fn test_collision_gets_timestamp_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("Screenshot 2024-05-01 at 10.22.13.png");
        std::fs::write(&shot, b"new").unwrap();
        let taken = dir.path().join("screenshot_2024-05-01-chart.png");
        std::fs::write(&taken, b"old").unwrap();

        let (renamer, _) = renamer(vec![moondream()], "chart", false);
        let outcome = renamer.process_image(&shot).await.unwrap();

        assert_ne!(outcome.new_path, taken);
        assert_eq!(std::fs::read(&taken).unwrap(), b"old");
        let name = outcome.new_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("screenshot_2024-05-01-chart_"));
        assert!(name.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_run_processes_pending_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Screenshot 2024-05-01 at 10.00.00.png"), b"a").unwrap();
        std::fs::write(dir.path().join("screenshot_2024-04-01-old_name.png"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();

        let (renamer, prompts) = renamer(vec![moondream()], "<response>build_log</response>", false);
        let outcomes = renamer.run(dir.path()).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(prompts.lock().unwrap().len(), 1);
        assert!(dir.path().join("screenshot_2024-05-01-build_log.png").exists());
        assert!(dir.path().join("screenshot_2024-04-01-old_name.png").exists());
    }

    #[tokio::test]
    async fn test_hash_failure_leaves_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        // A directory named like a screenshot cannot be hashed
        let shot = dir.path().join("Screenshot 2024-05-01 at 10.00.00.png");
        std::fs::create_dir(&shot).unwrap();

        let (renamer, _) = renamer(vec![moondream()], "<response>build_log</response>", false);
        let renamer = renamer.with_history(History::new(dir.path().join("history.jsonl")));

        assert!(renamer.process_image(&shot).await.is_err());
        assert!(shot.exists());
        assert!(!dir.path().join("screenshot_2024-05-01-build_log.png").exists());
    }

    #[tokio::test]
    async fn test_renamed_files_are_skipped_on_next_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Screenshot 2024-05-01 at 10.00.00.png"), b"a").unwrap();

        let (renamer, _) = renamer(vec![moondream()], "<response>release notes v2.1</response>", false);
        let outcomes = renamer.run(dir.path()).await.unwrap();
        assert_eq!(outcomes.len(), 1);

        let scan = scan_directory(dir.path()).unwrap();
        assert!(scan.pending.is_empty());
        assert_eq!(scan.already_renamed, vec!["screenshot_2024-05-01-release_notes_v21.png".to_string()]);
    }

    #[tokio::test]
    async fn test_run_with_nothing_to_do() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("screenshot_2024-04-01-old_name.png"), b"b").unwrap();

        let (renamer, prompts) = renamer(vec![moondream()], "unused", false);
        assert!(renamer.run(dir.path()).await.unwrap().is_empty());
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_renamer_requires_captioner() {
        let model = FakeModel { response: "", prompts: Arc::new(Mutex::new(Vec::new())) };
        let result = Renamer::new(Box::new(FakeOcr("")), Vec::new(), Box::new(model), RenamerOptions::default());
        assert!(result.is_err());
    }
}
