//! Progress reporting for long-running ingest operations.
//!
//! Mirrors the teacher's `IndexingProgress`/`SharedIndexingProgress` pattern:
//! a plain data struct updated under a shared `RwLock` so both the CLI's
//! polling loop and a `tracing` span can observe the same state.

use crate::errors::FileError;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Coarse phase of an `IndexDirectory` run, used for percentage estimates
/// and terminal UX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingStatus {
    Idle,
    Scanning,
    Indexing,
    Reducing,
    Completed,
}

impl Default for IndexingStatus {
    fn default() -> Self {
        IndexingStatus::Idle
    }
}

/// Snapshot of an in-flight (or just-finished) `IndexDirectory` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexingProgress {
    pub status: IndexingStatus,
    pub files_processed: usize,
    pub total_files: usize,
    pub current_file: Option<String>,
    pub errors: Vec<FileError>,
    pub is_scanning: bool,
    #[serde(skip)]
    pub started_at: Option<Instant>,
}

impl IndexingProgress {
    pub fn start() -> Self {
        Self {
            status: IndexingStatus::Scanning,
            is_scanning: true,
            started_at: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.files_processed as f64 / secs
    }

    pub fn estimated_time_left(&self) -> Option<Duration> {
        if self.total_files == 0 || self.files_processed == 0 {
            return None;
        }
        let rate = self.files_per_second();
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.total_files.saturating_sub(self.files_processed) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    }

    /// Percentage of scanning complete; scanning and indexing are reported
    /// as two independent bars since the scanner streams into the pipeline
    /// concurrently with the processors draining it.
    pub fn scanning_progress_percent(&self) -> u8 {
        if !self.is_scanning {
            return 100;
        }
        if self.total_files == 0 {
            5
        } else {
            ((self.files_processed as f64 / self.total_files as f64) * 100.0).min(99.0) as u8
        }
    }

    pub fn indexing_progress_percent(&self) -> u8 {
        match self.status {
            IndexingStatus::Idle => 0,
            IndexingStatus::Scanning => 0,
            IndexingStatus::Indexing => {
                if self.total_files == 0 {
                    10
                } else {
                    ((self.files_processed as f64 / self.total_files as f64) * 90.0) as u8
                }
            }
            IndexingStatus::Reducing => 95,
            IndexingStatus::Completed => 100,
        }
    }
}

/// Shared, pollable progress handle passed down through the ingest pipeline.
pub type SharedIndexingProgress = Arc<RwLock<IndexingProgress>>;

pub fn new_shared_progress() -> SharedIndexingProgress {
    Arc::new(RwLock::new(IndexingProgress::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_complete_on_empty_directory() {
        let mut p = IndexingProgress::start();
        p.status = IndexingStatus::Completed;
        p.is_scanning = false;
        assert_eq!(p.scanning_progress_percent(), 100);
        assert_eq!(p.indexing_progress_percent(), 100);
    }

    #[test]
    fn eta_is_none_before_any_progress() {
        let p = IndexingProgress::start();
        assert!(p.estimated_time_left().is_none());
    }
}
