// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Console progress helpers: previews, durations and ETAs

use chrono::{DateTime, Local};
use std::io::IsTerminal;
use std::time::Duration;

/// Word-wrap `text` into at most `max_lines` lines of `line_length` chars
pub fn format_preview(text: &str, max_lines: usize, line_length: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + word.chars().count() + 1 > line_length {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            if lines.len() == max_lines {
                current.clear();
                break;
            }
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }

    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }

    lines.join("\n")
}

/// `1h 2m 3s`, `2m 3s` or `3s`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds as u64 } else { 0 };
    let (minutes, secs) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Wall-clock time `seconds` after `start`, like `3:07 PM`
pub fn clock_after(start: DateTime<Local>, seconds: f64) -> String {
    let eta = start + chrono::Duration::milliseconds((seconds.max(0.0) * 1000.0) as i64);
    eta.format("%I:%M %p").to_string().trim_start_matches('0').to_string()
}

/// Per-image timing for a batch run
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    durations: Vec<Duration>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, duration: Duration) {
        self.durations.push(duration);
    }

    pub fn count(&self) -> usize {
        self.durations.len()
    }

    pub fn total_secs(&self) -> f64 {
        self.durations.iter().map(Duration::as_secs_f64).sum()
    }

    pub fn average_secs(&self) -> f64 {
        if self.durations.is_empty() {
            0.0
        } else {
            self.total_secs() / self.durations.len() as f64
        }
    }

    /// Estimated seconds left for `remaining` images at the running average
    pub fn eta_secs(&self, remaining: usize) -> f64 {
        self.average_secs() * remaining as f64
    }
}

/// Decide whether log output should carry ANSI colours
pub fn should_use_color(no_color: bool) -> bool {
    if no_color {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        return false;
    }
    if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
        return false;
    }
    std::io::stdout().is_terminal()
}
