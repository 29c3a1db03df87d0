//! Closed error taxonomy for the indexing engine.
//!
//! Library-facing calls return `Result<T, IndexError>` so callers can match on
//! the kind of failure. Internal plumbing (CLI, test fixtures) keeps using
//! `anyhow::Result` for ergonomic `?` chains; `IndexError` converts into
//! `anyhow::Error` automatically.

use crate::progress::IndexingProgress;
use std::path::PathBuf;
use thiserror::Error;

/// A per-file error recorded against progress. Never promoted to a top-level
/// `IndexError` on its own - parse/read failures are soft by design.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: FileErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    Read,
    Parse,
    SizeLimit,
    Binary,
}

/// The closed set of failure kinds the engine can report at its API boundary.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("indexing already in progress")]
    InProgress { progress: Box<IndexingProgress> },

    #[error("timed out acquiring {lock_name} after {timeout_ms}ms")]
    Timeout { lock_name: String, timeout_ms: u64 },

    #[error("resource pressure: {0}")]
    Resource(String),

    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("index integrity violation: {0}")]
    Integrity(String),

    #[error("operation attempted after shutdown")]
    Shutdown,
}

impl IndexError {
    pub fn validation(msg: impl Into<String>) -> Self {
        IndexError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        IndexError::NotFound(msg.into())
    }

    pub fn timeout(lock_name: impl Into<String>, timeout_ms: u64) -> Self {
        IndexError::Timeout {
            lock_name: lock_name.into(),
            timeout_ms,
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
