//! Debounced global-structure rebuilder.
//!
//! Point updates (`UpdateFile`/`RemoveFile`) integrate immediately but defer
//! the corpus-wide reference re-resolution pass - re-running it after every
//! single file would make a burst of edits (a branch checkout, a find/replace
//! across the tree) quadratic in the number of files touched. Instead each
//! point update calls [`Rebuilder::schedule`], which coalesces into a pending
//! set and fires [`crate::ingest::integrator::reduce_references_and_counts`]
//! once the set settles for `debounce` without a new arrival.

use crate::index::reference_tracker::ReferenceTracker;
use crate::index::snapshot::SnapshotHandle;
use crate::index::symbol_index::SymbolIndex;
use crate::ingest::integrator::reduce_references_and_counts;
use crate::model::FileId;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const DEFAULT_DEBOUNCE_MS: u64 = 50;

enum Message {
    Schedule(FileId),
    Force,
    Shutdown,
}

/// Owns the background thread that runs the reduce phase. Cloning the
/// `Sender` side is cheap, so the coordinator hands out `schedule` calls from
/// any ingest thread without needing its own lock.
pub struct Rebuilder {
    tx: Sender<Message>,
    handle: Option<JoinHandle<()>>,
}

impl Rebuilder {
    pub fn spawn(symbol_index: Arc<SymbolIndex>, reference_tracker: Arc<ReferenceTracker>, snapshot: Arc<SnapshotHandle>) -> Self {
        Self::spawn_with_debounce(symbol_index, reference_tracker, snapshot, Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    pub fn spawn_with_debounce(
        symbol_index: Arc<SymbolIndex>,
        reference_tracker: Arc<ReferenceTracker>,
        snapshot: Arc<SnapshotHandle>,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Message>();

        let handle = std::thread::Builder::new()
            .name("codeloom-rebuilder".to_string())
            .spawn(move || {
                let mut pending = false;
                loop {
                    let recv_result = if pending {
                        rx.recv_timeout(debounce)
                    } else {
                        rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected)
                    };

                    match recv_result {
                        Ok(Message::Schedule(_)) => {
                            pending = true;
                        }
                        Ok(Message::Force) => {
                            reduce_references_and_counts(&symbol_index, &reference_tracker, &snapshot.load());
                            pending = false;
                        }
                        Ok(Message::Shutdown) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            // The pending batch settled with no new arrivals.
                            reduce_references_and_counts(&symbol_index, &reference_tracker, &snapshot.load());
                            pending = false;
                        }
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("failed to spawn rebuilder thread");

        Self { tx, handle: Some(handle) }
    }

    /// Coalesce a rebuild request for `file_id` into the pending batch. The
    /// id itself isn't tracked individually - the rebuild is always a full
    /// reduce pass, since a forward reference anywhere in the corpus can
    /// point at any newly-settled file.
    pub fn schedule(&self, file_id: FileId) {
        let _ = self.tx.send(Message::Schedule(file_id));
    }

    /// Run the reduce pass immediately regardless of the debounce window.
    pub fn force_rebuild(&self) {
        let _ = self.tx.send(Message::Force);
    }

    /// Idempotent: a second call after the thread has already stopped is a
    /// harmless no-op.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Rebuilder {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}
