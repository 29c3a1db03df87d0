//! FileProcessor worker pool: reads each scanned file's content, invokes the
//! pluggable [`crate::parser::Parser`], computes bucketed trigrams, and
//! forwards the result to the integrator. Each worker owns a private parser
//! instance so tree-sitter's internal state is never shared across threads.

use crate::errors::{FileError, FileErrorKind};
use crate::index::trigram::BucketedTrigrams;
use crate::model::{FileTask, ParsedFile};
use crate::parser;
use crate::progress::SharedIndexingProgress;
use crate::utils::transcode_to_utf8;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Everything the integrator needs for one file: the bytes, the parse
/// result, and its precomputed trigram buckets.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub parsed: ParsedFile,
    pub bucketed: Arc<BucketedTrigrams>,
}

/// A pool of worker threads pulling [`FileTask`]s from a shared receiver and
/// pushing [`ProcessedFile`]s onto a bounded result channel.
pub struct ProcessorPool {
    handles: Vec<JoinHandle<()>>,
}

impl ProcessorPool {
    /// Spawn `worker_count` workers (each with a private parser instance).
    /// `bucket_count` must match the trigram index's bucket count so
    /// `BucketedTrigrams::compute` output can be merged directly.
    pub fn spawn(
        rx: Receiver<FileTask>,
        tx: SyncSender<ProcessedFile>,
        worker_count: usize,
        bucket_count: usize,
        progress: Option<SharedIndexingProgress>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let rx = Arc::new(Mutex::new(rx));
        let mut handles = Vec::with_capacity(worker_count);

        for worker_idx in 0..worker_count {
            let rx = rx.clone();
            let tx = tx.clone();
            let progress = progress.clone();
            let handle = std::thread::Builder::new()
                .name(format!("codeloom-processor-{worker_idx}"))
                .spawn(move || {
                    let mut parser = parser::new_parser();
                    loop {
                        let task = {
                            let guard = rx.lock().unwrap();
                            guard.recv()
                        };
                        let Ok(task) = task else {
                            break;
                        };
                        match process_one(parser.as_mut(), &task.path, bucket_count) {
                            Ok(processed) => {
                                if tx.send(processed).is_err() {
                                    break;
                                }
                            }
                            Err(file_error) => {
                                if let Some(progress) = &progress {
                                    progress.write().unwrap().errors.push(file_error);
                                }
                            }
                        }
                    }
                })
                .expect("failed to spawn processor worker");
            handles.push(handle);
        }

        Self { handles }
    }

    /// Block until every worker has drained its receiver and exited - the
    /// receiver side must already be closed (scanner finished and dropped
    /// its sender) or this never returns.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Reads, parses, and trigram-computes one file. A parser panic is caught so
/// one hostile/malformed input doesn't take down the whole worker; the
/// parser is still usable afterward since tree-sitter parsers don't hold
/// locks across a parse call.
fn process_one(parser: &mut dyn parser::Parser, path: &std::path::Path, bucket_count: usize) -> Result<ProcessedFile, FileError> {
    let bytes = std::fs::read(path).map_err(|e| FileError {
        path: path.to_path_buf(),
        kind: FileErrorKind::Read,
        message: e.to_string(),
    })?;

    let text = match std::str::from_utf8(&bytes) {
        Ok(s) => s.to_string(),
        Err(_) => match transcode_to_utf8(&bytes) {
            Some((s, _)) => s,
            None => {
                return Err(FileError {
                    path: path.to_path_buf(),
                    kind: FileErrorKind::Binary,
                    message: "content is not valid text in any detected encoding".to_string(),
                })
            }
        },
    };

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let parse_result = catch_unwind(AssertUnwindSafe(|| parser.parse(extension, &text)));
    let parsed = match parse_result {
        Ok(parsed) => parsed,
        Err(_) => {
            return Err(FileError {
                path: path.to_path_buf(),
                kind: FileErrorKind::Parse,
                message: "parser panicked".to_string(),
            })
        }
    };

    let bucketed = Arc::new(BucketedTrigrams::compute(&bytes, bucket_count));

    Ok(ProcessedFile { path: path.to_path_buf(), content: bytes, parsed, bucketed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn processes_a_rust_file_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.rs");
        fs::write(&path, "fn hello() {}\n").unwrap();

        let (task_tx, task_rx) = mpsc::sync_channel(4);
        let (result_tx, result_rx) = mpsc::sync_channel(4);
        task_tx.send(FileTask { path: path.clone(), priority: 0 }).unwrap();
        drop(task_tx);

        let pool = ProcessorPool::spawn(task_rx, result_tx, 1, 16, None);
        let processed = result_rx.recv().unwrap();
        drop(result_rx);
        pool.join();

        assert_eq!(processed.path, path);
        assert!(!processed.parsed.symbols.is_empty());
        assert!(processed.bucketed.buckets.iter().any(|b| !b.is_empty()));
    }

    #[test]
    fn read_failure_is_recorded_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.rs");

        let (task_tx, task_rx) = mpsc::sync_channel(4);
        let (result_tx, result_rx) = mpsc::sync_channel(4);
        task_tx.send(FileTask { path: missing, priority: 0 }).unwrap();
        drop(task_tx);

        let progress = crate::progress::new_shared_progress();
        let pool = ProcessorPool::spawn(task_rx, result_tx, 1, 16, Some(progress.clone()));
        drop(result_rx);
        pool.join();

        assert_eq!(progress.read().unwrap().errors.len(), 1);
    }
}
