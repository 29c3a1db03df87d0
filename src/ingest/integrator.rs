//! FileIntegrator: the single writer that publishes each processed file into
//! every sub-index and, at end-of-stream, performs the atomic snapshot swap
//! and the reduce phase (corpus-wide reference re-resolution, reference-count
//! finalization).

use crate::index::content_store::ContentStore;
use crate::index::deleted_set::DeletedSet;
use crate::index::location_index::LocationIndex;
use crate::index::merger::TrigramMerger;
use crate::index::reference_tracker::{Direction, ReferenceTracker};
use crate::index::snapshot::SnapshotHandle;
use crate::index::symbol_index::SymbolIndex;
use crate::index::trigram::ShardedTrigramIndex;
use crate::ingest::processor::ProcessedFile;
use crate::model::{FileId, Scope};
use crate::progress::SharedIndexingProgress;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Receiver;

/// Summary of a finished bulk ingest stream.
#[derive(Debug, Default, Clone)]
pub struct IngestOutcome {
    pub files_indexed: usize,
}

/// Owns no state itself beyond the `FileId` counter - every sub-index it
/// touches is borrowed from the coordinator, which is the sole owner. This
/// mirrors the design's "Integrator is the sole mutator during bulk ingest"
/// invariant: as long as only one `Integrator` call runs at a time against a
/// given set of sub-indexes, none of the writes below need their own lock
/// beyond what each sub-index already provides internally.
pub struct Integrator<'a> {
    pub next_file_id: &'a AtomicU32,
    pub snapshot: &'a SnapshotHandle,
    pub trigram_index: &'a ShardedTrigramIndex,
    pub merger: Option<&'a TrigramMerger>,
    pub symbol_index: &'a SymbolIndex,
    pub reference_tracker: &'a ReferenceTracker,
    pub location_index: &'a LocationIndex,
    pub content_store: &'a ContentStore,
    pub deleted_set: &'a DeletedSet,
}

impl<'a> Integrator<'a> {
    fn next_id(&self) -> FileId {
        FileId(self.next_file_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Drain `rx` until the upstream processor pool closes it, integrating
    /// every file into all sub-indexes except the snapshot - which is
    /// deferred to a single atomic publish once the stream ends, so bulk
    /// ingest never exposes a partially-indexed tree to a reader.
    pub fn integrate_stream(&self, rx: Receiver<ProcessedFile>, progress: Option<SharedIndexingProgress>) -> IngestOutcome {
        let mut pending_snapshot: Vec<(PathBuf, FileId, Vec<Scope>)> = Vec::new();

        while let Ok(mut processed) = rx.recv() {
            let file_id = self.next_id();
            processed.parsed.retag_file_id(file_id);
            self.integrate_one(file_id, &processed);
            pending_snapshot.push((processed.path.clone(), file_id, processed.parsed.scopes.clone()));

            if let Some(progress) = &progress {
                let mut progress = progress.write().unwrap();
                progress.files_processed += 1;
                progress.current_file = Some(processed.path.display().to_string());
            }
        }

        let files_indexed = pending_snapshot.len();
        self.snapshot.publish(|builder| {
            for (path, id, scopes) in pending_snapshot {
                builder.insert_file(path, id, scopes);
            }
        });
        self.reduce();

        IngestOutcome { files_indexed }
    }

    /// Incremental path for a single `IndexFile`/`UpdateFile` call: there is
    /// no batch to defer, so the snapshot publish happens immediately after
    /// the sub-index writes. Unlike [`Self::integrate_stream`], this does
    /// *not* run the reduce phase inline - the caller schedules a debounced
    /// rebuild instead, per the design's "defer global graph rebuilds after
    /// point updates" policy.
    pub fn integrate_single(&self, mut processed: ProcessedFile) -> FileId {
        let file_id = self.next_id();
        processed.parsed.retag_file_id(file_id);
        self.integrate_one(file_id, &processed);
        let scopes = processed.parsed.scopes.clone();
        self.snapshot.publish(|builder| builder.insert_file(processed.path.clone(), file_id, scopes));
        file_id
    }

    fn integrate_one(&self, file_id: FileId, processed: &ProcessedFile) {
        self.content_store.insert(file_id, processed.content.clone());

        match self.merger {
            Some(merger) => {
                merger.submit_with_backoff(file_id, processed.bucketed.clone(), 5);
            }
            None => self.trigram_index.add_file_direct(file_id, &processed.bucketed),
        }

        self.symbol_index.index_symbols(file_id, processed.parsed.symbols.clone());
        self.location_index.index_file(file_id, &processed.parsed.symbols);
        self.reference_tracker.process_file(
            self.symbol_index,
            &self.snapshot.load(),
            file_id,
            processed.parsed.references.clone(),
        );
    }

    /// Remove every trace of `file_id` from every sub-index, marking it
    /// deleted first so a query racing the removal sees it filtered rather
    /// than returning stale content.
    pub fn remove_file(&self, file_id: FileId) {
        self.deleted_set.mark_deleted(file_id);

        if let Some(old_content) = self.content_store.get_content(file_id) {
            self.trigram_index.remove_file(file_id, &old_content);
        }
        self.symbol_index.remove_file_symbols(file_id);
        self.reference_tracker.remove_file(file_id);
        self.location_index.remove_file(file_id);
        self.content_store.invalidate(file_id);
        self.snapshot.publish(|builder| builder.remove_file(file_id));

        // Nothing else can still be referencing this FileId once every
        // sub-index and the snapshot have dropped it under the coordinator's
        // write lock, so it's safe to reclaim immediately.
        self.deleted_set.reclaim(file_id);
    }

    /// Reduce phase: re-resolve every reference against the now-complete
    /// symbol table and file snapshot (catches forward references across
    /// files, including includes whose target only just got indexed), then
    /// stamp each symbol's incoming/outgoing counts for `GetTopSymbols` et al.
    pub fn reduce(&self) {
        reduce_references_and_counts(self.symbol_index, self.reference_tracker, &self.snapshot.load());
    }
}

/// Free-standing form of [`Integrator::reduce`] so the debounced rebuilder
/// can run it from a background thread without borrowing a whole
/// `Integrator` (and the lifetime that comes with it) - it only ever touches
/// the symbol table, the reference tracker, and a loaded snapshot.
pub fn reduce_references_and_counts(symbol_index: &SymbolIndex, reference_tracker: &ReferenceTracker, snapshot: &crate::index::snapshot::FileSnapshot) {
    reference_tracker.process_all_references(symbol_index, snapshot);
    for id in symbol_index.all_ids() {
        let incoming = reference_tracker.get_symbol_references(id, Direction::Incoming).len() as u32;
        let outgoing = reference_tracker.get_symbol_references(id, Direction::Outgoing).len() as u32;
        symbol_index.set_reference_counts(id, incoming, outgoing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::processor::ProcessedFile;
    use crate::index::trigram::BucketedTrigrams;
    use crate::model::ParsedFile;
    use crate::parser::{self, Parser};
    use std::sync::mpsc;
    use std::sync::Arc;

    fn processed_file(path: &str, content: &str) -> ProcessedFile {
        let mut parser = parser::new_parser();
        let parsed: ParsedFile = parser.parse("rs", content);
        ProcessedFile {
            path: PathBuf::from(path),
            content: content.as_bytes().to_vec(),
            bucketed: Arc::new(BucketedTrigrams::compute(content.as_bytes(), 16)),
            parsed,
        }
    }

    struct Harness {
        next_file_id: AtomicU32,
        snapshot: SnapshotHandle,
        trigram_index: ShardedTrigramIndex,
        symbol_index: SymbolIndex,
        reference_tracker: ReferenceTracker,
        location_index: LocationIndex,
        content_store: ContentStore,
        deleted_set: DeletedSet,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                next_file_id: AtomicU32::new(1),
                snapshot: SnapshotHandle::new(),
                trigram_index: ShardedTrigramIndex::new(16),
                symbol_index: SymbolIndex::new(),
                reference_tracker: ReferenceTracker::new(),
                location_index: LocationIndex::new(),
                content_store: ContentStore::with_budget(1024 * 1024),
                deleted_set: DeletedSet::new(),
            }
        }

        fn integrator(&self) -> Integrator<'_> {
            Integrator {
                next_file_id: &self.next_file_id,
                snapshot: &self.snapshot,
                trigram_index: &self.trigram_index,
                merger: None,
                symbol_index: &self.symbol_index,
                reference_tracker: &self.reference_tracker,
                location_index: &self.location_index,
                content_store: &self.content_store,
                deleted_set: &self.deleted_set,
            }
        }
    }

    #[test]
    fn single_file_is_queryable_after_integrate() {
        let harness = Harness::new();
        let integrator = harness.integrator();
        let file_id = integrator.integrate_single(processed_file("/a.rs", "fn hello() {}\n"));

        let snapshot = harness.snapshot.load();
        assert_eq!(snapshot.get_path(file_id), Some(std::path::Path::new("/a.rs")));
        assert!(harness.trigram_index.find_candidates("hello", false).contains(&file_id));
        assert_eq!(harness.symbol_index.find_by_name("hello").len(), 1);
    }

    #[test]
    fn bulk_stream_defers_snapshot_until_end() {
        let harness = Harness::new();
        let integrator = harness.integrator();
        let (tx, rx) = mpsc::sync_channel(8);
        tx.send(processed_file("/a.rs", "fn a() {}\n")).unwrap();
        tx.send(processed_file("/b.rs", "fn b() {}\n")).unwrap();
        drop(tx);

        let outcome = integrator.integrate_stream(rx, None);
        assert_eq!(outcome.files_indexed, 2);
        assert_eq!(harness.snapshot.load().file_count(), 2);
    }

    #[test]
    fn remove_file_clears_every_sub_index() {
        let harness = Harness::new();
        let integrator = harness.integrator();
        let file_id = integrator.integrate_single(processed_file("/a.rs", "fn hello() {}\n"));

        integrator.remove_file(file_id);

        assert!(harness.snapshot.load().get_path(file_id).is_none());
        assert!(harness.trigram_index.find_candidates("hello", false).is_empty());
        assert!(harness.symbol_index.find_by_name("hello").is_empty());
        assert!(!harness.deleted_set.is_deleted(file_id));
        assert!(!harness.content_store.contains(file_id));
    }

    #[test]
    fn reduce_stamps_incoming_reference_counts() {
        let harness = Harness::new();
        let integrator = harness.integrator();
        integrator.integrate_single(processed_file("/callee.rs", "fn target() {}\n"));
        integrator.integrate_single(processed_file("/caller.rs", "fn caller() { target(); }\n"));
        integrator.reduce();

        let target = harness.symbol_index.find_by_name("target").remove(0);
        assert_eq!(target.incoming_references, 1);
    }
}
