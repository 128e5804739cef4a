//! Append-only run history (`game_history.jsonl`) and the high score read
//! back from it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::score::RunSummary;

/// One line of the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp_utc: DateTime<Utc>,
    pub attempts: u32,
    pub score: u32,
    pub accuracy_pct: f64,
    pub duration_seconds: f64,
    pub library_size: usize,
    pub snippet_seconds: u32,
    pub end_reason: String,
}

fn two_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl RunRecord {
    pub fn from_summary(
        summary: &RunSummary,
        ended_at: DateTime<Utc>,
        library_size: usize,
        snippet_seconds: u32,
    ) -> Self {
        Self {
            timestamp_utc: ended_at,
            attempts: summary.rounds_played,
            score: summary.score,
            accuracy_pct: two_decimals(summary.accuracy_pct()),
            duration_seconds: two_decimals(summary.duration.as_secs_f64()),
            library_size,
            snippet_seconds,
            end_reason: summary.ended_reason.as_str().to_string(),
        }
    }
}

pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &RunRecord) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        log::info!(
            "[History] recorded score {} ({}) to {}",
            record.score,
            record.end_reason,
            self.path.display()
        );
        Ok(())
    }

    /// Best score on record. Malformed lines are skipped; an unreadable
    /// file counts as no history.
    pub fn high_score(&self) -> u32 {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("[History] no history at {}: {e}", self.path.display());
                return 0;
            }
        };
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
            .filter_map(|v| v.get("score").and_then(serde_json::Value::as_u64))
            .map(|s| u32::try_from(s).unwrap_or(u32::MAX))
            .max()
            .unwrap_or(0)
    }
}
