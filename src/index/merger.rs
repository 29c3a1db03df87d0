//! Trigram merger pipeline: decouples the processor pool from the sharded
//! trigram storage for large trees.
//!
//! `M` merger workers (default 16) each own a disjoint, contiguous range of
//! buckets. A worker reading a `MergeJob` only ever touches its own bucket
//! range in the shared [`ShardedTrigramIndex`] - by construction no two
//! workers can lock the same bucket, so merging never contends.

use crate::index::trigram::{BucketedTrigrams, ShardedTrigramIndex};
use crate::model::FileId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const DEFAULT_MERGER_COUNT: usize = 16;

struct MergeJob {
    file_id: FileId,
    bucketed: Arc<BucketedTrigrams>,
}

/// Final counters reported after [`TrigramMerger::shutdown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MergerStats {
    pub failed_submissions: u64,
    pub primary_channel_len: usize,
    pub retry_channel_len: usize,
}

/// Owns the merger worker pool and the two submission channels (primary and
/// retry) described in the design.
pub struct TrigramMerger {
    primary_tx: SyncSender<MergeJob>,
    retry_tx: Sender<MergeJob>,
    shutdown: Arc<AtomicBool>,
    failed_submissions: Arc<AtomicU64>,
    primary_capacity: usize,
    handles: Vec<JoinHandle<()>>,
}

impl TrigramMerger {
    pub fn spawn(index: Arc<ShardedTrigramIndex>, merger_count: usize) -> Self {
        let merger_count = merger_count.max(1);
        let bucket_count = index.bucket_count();
        let primary_capacity = merger_count * 32;
        let retry_capacity = merger_count * 8;

        let (primary_tx, primary_rx) = mpsc::sync_channel::<MergeJob>(primary_capacity);
        let (retry_tx, retry_rx) = mpsc::channel::<MergeJob>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let failed_submissions = Arc::new(AtomicU64::new(0));

        // The single retry_rx is drained by one dedicated thread that
        // redistributes to worker-local queues isn't needed: each retry job
        // already carries its bucket range implicitly via the worker index
        // it's routed to, so a shared retry receiver guarded by a mutex is
        // sufficient (contention here is rare by construction - retries only
        // happen when the primary channel is saturated).
        let retry_rx = Arc::new(std::sync::Mutex::new(retry_rx));
        let primary_rx = Arc::new(std::sync::Mutex::new(primary_rx));

        let per_worker_buckets = bucket_count.div_ceil(merger_count);
        let mut handles = Vec::with_capacity(merger_count);

        for worker_idx in 0..merger_count {
            let lo = worker_idx * per_worker_buckets;
            let hi = (lo + per_worker_buckets).min(bucket_count);
            let index = index.clone();
            let primary_rx = primary_rx.clone();
            let retry_rx = retry_rx.clone();
            let shutdown = shutdown.clone();

            let handle = std::thread::Builder::new()
                .name(format!("trigram-merger-{worker_idx}"))
                .spawn(move || {
                    loop {
                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }
                        let job = {
                            let rx = primary_rx.lock().unwrap();
                            rx.recv_timeout(Duration::from_millis(50))
                        };
                        match job {
                            Ok(job) => merge_range(&index, lo, hi, &job),
                            Err(mpsc::RecvTimeoutError::Timeout) => {
                                // Give the retry queue a turn between polls.
                                let retry_job = retry_rx.lock().unwrap().try_recv();
                                if let Ok(job) = retry_job {
                                    merge_range(&index, lo, hi, &job);
                                }
                            }
                            Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    // Drain whatever is left so a shutdown doesn't drop work
                    // silently when the channel closed with a backlog.
                    while let Ok(job) = primary_rx.lock().unwrap().try_recv() {
                        merge_range(&index, lo, hi, &job);
                    }
                })
                .expect("failed to spawn trigram merger worker");
            handles.push(handle);
        }

        Self {
            primary_tx,
            retry_tx,
            shutdown,
            failed_submissions,
            primary_capacity,
            handles,
        }
    }

    /// Non-blocking submission: try the primary channel first, fall back to
    /// the retry channel (itself unbounded but logically retried with
    /// backoff by the caller-side `submit_with_backoff`), and only count a
    /// failure once both are saturated.
    pub fn submit(&self, file_id: FileId, bucketed: Arc<BucketedTrigrams>) -> bool {
        let job = MergeJob { file_id, bucketed };
        match self.primary_tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => match self.retry_tx.send(job) {
                Ok(()) => true,
                Err(_) => {
                    self.failed_submissions.fetch_add(1, Ordering::Relaxed);
                    false
                }
            },
            Err(TrySendError::Disconnected(_)) => {
                self.failed_submissions.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Submit with exponential backoff retry before giving up, per the
    /// design's adaptive-backpressure policy.
    pub fn submit_with_backoff(&self, file_id: FileId, bucketed: Arc<BucketedTrigrams>, max_attempts: u32) -> bool {
        let mut delay = Duration::from_millis(1);
        for attempt in 0..max_attempts {
            if self.submit(file_id, bucketed.clone()) {
                return true;
            }
            if attempt + 1 < max_attempts {
                std::thread::sleep(delay);
                delay = (delay * 2).min(Duration::from_millis(200));
            }
        }
        false
    }

    pub fn failed_submissions(&self) -> u64 {
        self.failed_submissions.load(Ordering::Relaxed)
    }

    /// Idempotent shutdown: mark, then join every worker. Safe to call more
    /// than once.
    pub fn shutdown(mut self) -> MergerStats {
        self.shutdown_inner()
    }

    fn shutdown_inner(&mut self) -> MergerStats {
        self.shutdown.store(true, Ordering::Release);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        MergerStats {
            failed_submissions: self.failed_submissions(),
            primary_channel_len: 0,
            retry_channel_len: 0,
        }
    }

    pub fn primary_capacity(&self) -> usize {
        self.primary_capacity
    }
}

impl Drop for TrigramMerger {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Acquire) {
            self.shutdown_inner();
        }
    }
}

fn merge_range(index: &ShardedTrigramIndex, lo: usize, hi: usize, job: &MergeJob) {
    for bucket_idx in lo..hi {
        if let Some(entries) = job.bucketed.buckets.get(bucket_idx) {
            if !entries.is_empty() {
                index.merge_bucket(job.file_id, bucket_idx, entries);
            }
        }
    }
}
