//! Download statistics.

use std::path::Path;

use crate::download::engine::DownloadOutcome;

/// Counters for one CLI run.
#[derive(Debug, Default)]
pub struct DownloadStats {
    pub targets_processed: u64,
    pub targets_failed: u64,
    pub files_downloaded: u64,
    pub files_failed: u64,
    pub bytes_downloaded: u64,
}

impl DownloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a written file.
    pub fn record_file(&mut self, path: &Path) {
        self.files_downloaded += 1;
        self.bytes_downloaded += std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    }

    /// Record the outcomes of a batch.
    pub fn record_outcomes(&mut self, outcomes: &[DownloadOutcome]) {
        for outcome in outcomes {
            match &outcome.result {
                Ok(path) => self.record_file(path),
                Err(_) => self.files_failed += 1,
            }
        }
    }

    /// Mark a command-line target as done.
    pub fn mark_target_done(&mut self) {
        self.targets_processed += 1;
    }

    /// Mark a command-line target as failed before any download started.
    pub fn mark_target_failed(&mut self) {
        self.targets_processed += 1;
        self.targets_failed += 1;
    }

    pub fn has_failures(&self) -> bool {
        self.targets_failed > 0 || self.files_failed > 0
    }
}
