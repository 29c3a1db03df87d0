//! Master coordinator: the query entry point and the only thing callers
//! (the CLI, the integration tests) hold directly. Owns every sub-index and
//! the file snapshot, drives the ingest pipeline for `IndexDirectory`, and
//! serializes single-file mutations through a timeout-bounded lock so an
//! `UpdateFile`/`RemoveFile` never races a concurrent bulk ingest.
//!
//! Sub-index construction mirrors `ingest::integrator`'s test harness: one
//! owned instance of each, borrowed out to a transient `Integrator` for the
//! duration of a call rather than held behind the `Integrator` itself.

use crate::config::Config;
use crate::errors::{FileError, IndexError, IndexResult};
use crate::index::content_store::{ContentStore, MemoryPressure};
use crate::index::deleted_set::DeletedSet;
use crate::index::location_index::LocationIndex;
use crate::index::merger::{TrigramMerger, DEFAULT_MERGER_COUNT};
use crate::index::reference_tracker::{Direction, FunctionTreeNode, ReferenceTracker};
use crate::index::snapshot::SnapshotHandle;
use crate::index::symbol_index::SymbolIndex;
use crate::index::trigram::{BucketedTrigrams, ShardedTrigramIndex, DEFAULT_BUCKET_COUNT};
use crate::ingest::integrator::Integrator;
use crate::ingest::processor::{ProcessedFile, ProcessorPool};
use crate::ingest::scanner::{ScanOptions, ScanStats, Scanner};
use crate::model::{CompositeSymbolId, EnhancedSymbol, FileId, ParsedFile, SymbolKind};
use crate::parser;
use crate::progress::{new_shared_progress, IndexingProgress, IndexingStatus, SharedIndexingProgress};
use crate::rebuilder::Rebuilder;
use crate::search::executor::{SearchExecutor, SearchOptions, SearchResult};
use crate::search::query::parse_query;
use crate::search::PathFilter;
use crate::utils::{has_binary_extension, looks_binary, transcode_to_utf8, SystemLimits};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn};

const UPDATE_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const IDLE: u8 = 0;
const INDEXING: u8 = 1;

/// Outcome of a bulk `IndexDirectory` call.
#[derive(Debug, Clone)]
pub struct IndexDirectoryOutcome {
    pub files_indexed: usize,
    pub files_skipped_size: usize,
    pub files_skipped_binary: usize,
    pub errors: Vec<FileError>,
}

/// Outcome of a single-file `IndexFile` call.
#[derive(Debug, Clone)]
pub enum IndexFileOutcome {
    Ok(FileId),
    Skipped(&'static str),
}

/// External-facing search knobs, matching the `SearchWithOptions` surface.
/// `max_results` is signed so a negative value can be rejected by
/// validation rather than silently wrapping as an unsigned count.
#[derive(Debug, Clone)]
pub struct SearchWithOptions {
    pub case_insensitive: bool,
    pub use_regex: bool,
    pub max_context_lines: usize,
    pub max_results: i64,
    pub declaration_only: bool,
    pub usage_only: bool,
    pub symbol_types: Vec<SymbolKind>,
    pub include_pattern: Option<String>,
}

impl Default for SearchWithOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            use_regex: false,
            max_context_lines: 2,
            max_results: 0,
            declaration_only: false,
            usage_only: false,
            symbol_types: Vec::new(),
            include_pattern: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMatchType {
    Glob,
    Regex,
    Exact,
}

#[derive(Debug, Clone)]
pub struct FileSearchOptions {
    pub pattern: String,
    pub match_type: FileMatchType,
    pub directories: Vec<String>,
    pub extensions: Vec<String>,
    pub max_results: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct HealthMetrics {
    pub file_count: usize,
    pub symbol_count: usize,
    pub reference_count: usize,
    pub content_bytes: u64,
    pub is_indexing: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: HealthMetrics,
}

/// Holds every sub-index, the snapshot, and the background collaborators
/// (rebuilder, optional bulk-ingest merger). One coordinator per indexed
/// project; cheap to share across threads behind an `Arc`.
pub struct Coordinator {
    config: Config,
    next_file_id: AtomicU32,
    snapshot: Arc<SnapshotHandle>,
    trigram_index: Arc<ShardedTrigramIndex>,
    symbol_index: Arc<SymbolIndex>,
    reference_tracker: Arc<ReferenceTracker>,
    location_index: LocationIndex,
    content_store: ContentStore,
    deleted_set: DeletedSet,
    rebuilder: Mutex<Option<Rebuilder>>,
    ingest_state: AtomicU8,
    progress: SharedIndexingProgress,
    update_lock: Mutex<()>,
    closed: AtomicBool,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        let symbol_index = Arc::new(SymbolIndex::new());
        let reference_tracker = Arc::new(ReferenceTracker::new());
        let snapshot = Arc::new(SnapshotHandle::new());
        let rebuilder = Rebuilder::spawn_with_debounce(
            symbol_index.clone(),
            reference_tracker.clone(),
            snapshot.clone(),
            Duration::from_millis(config.index.watch_debounce_ms.max(1)),
        );

        let content_budget = config
            .performance
            .max_memory_mb
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or_else(|| SystemLimits::collect().safe_content_budget_bytes());

        Self {
            config,
            next_file_id: AtomicU32::new(1),
            snapshot,
            trigram_index: Arc::new(ShardedTrigramIndex::new(DEFAULT_BUCKET_COUNT)),
            symbol_index,
            reference_tracker,
            location_index: LocationIndex::new(),
            content_store: ContentStore::with_budget(content_budget),
            deleted_set: DeletedSet::new(),
            rebuilder: Mutex::new(Some(rebuilder)),
            ingest_state: AtomicU8::new(IDLE),
            progress: new_shared_progress(),
            update_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn progress(&self) -> IndexingProgress {
        self.progress.read().unwrap().clone()
    }

    pub fn file_count(&self) -> usize {
        self.snapshot.load().file_count()
    }

    fn check_open(&self) -> IndexResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(IndexError::Shutdown);
        }
        Ok(())
    }

    fn memory_gate(&self) -> IndexResult<()> {
        if self.config.feature_flags.enable_graceful_degradation
            && self.content_store.pressure() == MemoryPressure::Hard
        {
            return Err(IndexError::Resource("content store at hard memory ceiling".to_string()));
        }
        Ok(())
    }

    fn acquire_update_lock(&self) -> IndexResult<std::sync::MutexGuard<'_, ()>> {
        let deadline = Instant::now() + UPDATE_LOCK_TIMEOUT;
        loop {
            match self.update_lock.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(IndexError::timeout("update_lock", UPDATE_LOCK_TIMEOUT.as_millis() as u64));
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
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

    // ---------------------------------------------------------------
    // Ingest API
    // ---------------------------------------------------------------

    /// Bulk ingest: scan `root`, parse every admitted file through a worker
    /// pool, and integrate the results in one atomic snapshot publish.
    /// Rejects concurrent calls with `InProgress{progress}` rather than
    /// queuing them.
    pub fn index_directory(&self, root: &Path) -> IndexResult<IndexDirectoryOutcome> {
        self.check_open()?;

        if self
            .ingest_state
            .compare_exchange(IDLE, INDEXING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(IndexError::InProgress { progress: Box::new(self.progress()) });
        }

        let _span = info_span!("index_directory", root = %root.display()).entered();
        let outcome = self.run_index_directory(root);
        self.ingest_state.store(IDLE, Ordering::Release);
        outcome
    }

    fn run_index_directory(&self, root: &Path) -> IndexResult<IndexDirectoryOutcome> {
        {
            let mut progress = self.progress.write().unwrap();
            *progress = IndexingProgress::start();
        }
        self.symbol_index.set_bulk_indexing(true);

        let worker_count = self.config.performance.parallel_file_workers.max(1);
        let channel_capacity = worker_count * 4;

        let mut scan_options = ScanOptions::new(root.to_path_buf());
        scan_options.include = self.config.include.clone();
        scan_options.exclude = self.config.exclude.clone();
        scan_options.max_file_size = self.config.index.max_file_size;
        scan_options.max_total_size_bytes = self.config.index.max_total_size_mb.map(|mb| mb * 1024 * 1024);
        scan_options.max_file_count = self.config.index.max_file_count;

        let (task_tx, task_rx) = std::sync::mpsc::sync_channel(channel_capacity);
        let (result_tx, result_rx) = std::sync::mpsc::sync_channel(channel_capacity);
        let cancel = Arc::new(AtomicBool::new(false));

        let scan_cancel = cancel.clone();
        let scanner_handle = std::thread::Builder::new()
            .name("codeloom-scanner".to_string())
            .spawn(move || {
                let stats = Scanner::scan(&scan_options, &task_tx, &scan_cancel);
                drop(task_tx);
                stats
            })
            .expect("failed to spawn scanner thread");

        let bucket_count = self.trigram_index.bucket_count();
        let pool = ProcessorPool::spawn(task_rx, result_tx, worker_count, bucket_count, Some(self.progress.clone()));

        let merger = TrigramMerger::spawn(self.trigram_index.clone(), DEFAULT_MERGER_COUNT);
        let integrator = Integrator {
            next_file_id: &self.next_file_id,
            snapshot: &self.snapshot,
            trigram_index: &self.trigram_index,
            merger: Some(&merger),
            symbol_index: &self.symbol_index,
            reference_tracker: &self.reference_tracker,
            location_index: &self.location_index,
            content_store: &self.content_store,
            deleted_set: &self.deleted_set,
        };

        {
            let mut progress = self.progress.write().unwrap();
            progress.status = IndexingStatus::Indexing;
        }

        let ingest_outcome = integrator.integrate_stream(result_rx, Some(self.progress.clone()));
        pool.join();
        let merger_stats = merger.shutdown();
        if merger_stats.failed_submissions > 0 {
            warn!(failed = merger_stats.failed_submissions, "trigram merger dropped submissions under sustained backpressure");
        }

        let scan_stats: ScanStats = scanner_handle.join().unwrap_or_default();

        self.symbol_index.set_bulk_indexing(false);
        {
            let mut progress = self.progress.write().unwrap();
            progress.status = IndexingStatus::Completed;
            progress.is_scanning = false;
            progress.total_files = ingest_outcome.files_indexed;
            progress.errors.extend(scan_stats.errors.clone());
        }

        info!(
            files_indexed = ingest_outcome.files_indexed,
            files_skipped_size = scan_stats.files_skipped_size,
            files_skipped_binary = scan_stats.files_skipped_binary,
            "index_directory complete"
        );

        Ok(IndexDirectoryOutcome {
            files_indexed: ingest_outcome.files_indexed,
            files_skipped_size: scan_stats.files_skipped_size,
            files_skipped_binary: scan_stats.files_skipped_binary,
            errors: scan_stats.errors,
        })
    }

    /// Index (or re-index, if already present) a single file read fresh from
    /// disk. Behaves like `UpdateFile` when the path already has a live
    /// `FileId`: the old one is removed before the new one is inserted.
    pub fn index_file(&self, path: &Path) -> IndexResult<IndexFileOutcome> {
        self.check_open()?;
        if self.ingest_state.load(Ordering::Acquire) == INDEXING {
            return Err(IndexError::InProgress { progress: Box::new(self.progress()) });
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => return Err(IndexError::not_found(format!("{}: {err}", path.display()))),
        };

        self.replace_file(path, bytes)
    }

    /// Index or re-index a single file using caller-supplied bytes rather
    /// than reading from disk. Always mints a new `FileId`, even for
    /// byte-identical content.
    pub fn update_file(&self, path: &Path, content: &[u8]) -> IndexResult<FileId> {
        self.check_open()?;
        if self.ingest_state.load(Ordering::Acquire) == INDEXING {
            return Err(IndexError::InProgress { progress: Box::new(self.progress()) });
        }

        match self.replace_file(path, content.to_vec())? {
            IndexFileOutcome::Ok(id) => Ok(id),
            IndexFileOutcome::Skipped(reason) => Err(IndexError::validation(reason)),
        }
    }

    fn replace_file(&self, path: &Path, bytes: Vec<u8>) -> IndexResult<IndexFileOutcome> {
        self.memory_gate()?;
        let _guard = self.acquire_update_lock()?;

        if bytes.len() as u64 > self.config.index.max_file_size {
            return Ok(IndexFileOutcome::Skipped("file exceeds configured max_file_size"));
        }
        if has_binary_extension(path) || looks_binary(&bytes[..bytes.len().min(512)]) {
            return Ok(IndexFileOutcome::Skipped("file looks binary"));
        }

        let text = match std::str::from_utf8(&bytes) {
            Ok(s) => s.to_string(),
            Err(_) => match transcode_to_utf8(&bytes) {
                Some((s, _)) => s,
                None => return Ok(IndexFileOutcome::Skipped("content is not valid text in any detected encoding")),
            },
        };

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let mut parser = parser::new_parser();
        let parsed: ParsedFile = parser.parse(extension, &text);
        let bucketed = Arc::new(BucketedTrigrams::compute(&bytes, self.trigram_index.bucket_count()));

        let integrator = self.integrator();
        if let Some(existing_id) = self.snapshot.load().get_id(path) {
            integrator.remove_file(existing_id);
        }

        let processed = ProcessedFile { path: path.to_path_buf(), content: bytes, parsed, bucketed };
        let new_id = integrator.integrate_single(processed);

        if let Some(rebuilder) = self.rebuilder.lock().unwrap().as_ref() {
            rebuilder.schedule(new_id);
        }

        Ok(IndexFileOutcome::Ok(new_id))
    }

    /// Remove `path` from every sub-index. Idempotent: removing a path with
    /// no live `FileId` is a no-op success.
    pub fn remove_file(&self, path: &Path) -> IndexResult<()> {
        self.check_open()?;
        if self.ingest_state.load(Ordering::Acquire) == INDEXING {
            return Err(IndexError::InProgress { progress: Box::new(self.progress()) });
        }

        let _guard = self.acquire_update_lock()?;
        let Some(existing_id) = self.snapshot.load().get_id(path) else {
            return Ok(());
        };

        self.integrator().remove_file(existing_id);
        if let Some(rebuilder) = self.rebuilder.lock().unwrap().as_ref() {
            rebuilder.schedule(existing_id);
        }
        Ok(())
    }

    /// Wipe every sub-index and reset progress. Rejected while a bulk
    /// ingest is running.
    pub fn clear(&self) -> IndexResult<()> {
        self.check_open()?;
        if self.ingest_state.load(Ordering::Acquire) == INDEXING {
            return Err(IndexError::InProgress { progress: Box::new(self.progress()) });
        }

        let _guard = self.acquire_update_lock()?;
        self.trigram_index.clear();
        self.symbol_index.clear();
        self.reference_tracker.clear();
        self.location_index.clear();
        self.content_store.clear();
        self.deleted_set.clear();
        self.snapshot.publish(|b| b.clear());
        *self.progress.write().unwrap() = IndexingProgress::default();
        Ok(())
    }

    /// Stop the rebuilder and mark the coordinator closed; further calls
    /// return `IndexError::Shutdown`. Idempotent.
    pub fn close(&self) -> IndexResult<()> {
        self.closed.store(true, Ordering::Release);
        if let Some(mut rebuilder) = self.rebuilder.lock().unwrap().take() {
            rebuilder.shutdown();
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Query API
    // ---------------------------------------------------------------

    /// Simple search with default options, `max_context_lines` overriding
    /// the configured default when non-zero.
    pub fn search(&self, pattern: &str, max_context_lines: usize) -> IndexResult<Vec<SearchResult>> {
        let options = SearchWithOptions {
            max_context_lines: if max_context_lines == 0 { self.config.search.max_context_lines } else { max_context_lines },
            ..SearchWithOptions::default()
        };
        self.search_with_options(pattern, options)
    }

    /// The full query flow: memory gate, validation, prefix parsing,
    /// trigram-candidate retrieval, executor delegation, dedup.
    pub fn search_with_options(&self, pattern: &str, options: SearchWithOptions) -> IndexResult<Vec<SearchResult>> {
        self.check_open()?;
        self.memory_gate()?;

        if pattern.len() > 1000 {
            return Err(IndexError::validation("pattern exceeds 1000 characters"));
        }
        let max_results = match options.max_results {
            n if n < 0 => return Err(IndexError::validation("max_results must not be negative")),
            0 => self.config.search.max_results,
            n => n as usize,
        };

        let parsed_query = parse_query(pattern);
        if parsed_query.content_pattern.trim().is_empty() {
            return Err(IndexError::validation("pattern must contain a non-empty content token"));
        }

        let snapshot = self.snapshot.load();

        let include: Vec<String> = parsed_query.path_glob.iter().chain(options.include_pattern.iter()).cloned().collect();
        let path_filter = if include.is_empty() { None } else { Some(PathFilter::new(&include, &[]).map_err(|e| IndexError::validation(e.to_string()))?) };
        let passes_path_filters = |file_id: FileId| -> bool {
            let Some(path) = snapshot.get_path(file_id) else {
                return false;
            };
            if let Some(filter) = &path_filter {
                if !filter.matches(&path.to_string_lossy()) {
                    return false;
                }
            }
            if let Some(dir) = &parsed_query.dir_prefix {
                if !path.to_string_lossy().replace('\\', "/").contains(dir.as_str()) {
                    return false;
                }
            }
            if let Some(ext) = &parsed_query.ext {
                let wanted = ext.trim_start_matches('.');
                let matches_ext = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case(wanted)).unwrap_or(false);
                if !matches_ext {
                    return false;
                }
            }
            true
        };

        let executor =
            SearchExecutor { content_store: &self.content_store, location_index: &self.location_index, symbol_index: &self.symbol_index, snapshot: &snapshot };

        // `DeclarationOnly`/`UsageOnly` redirect straight to the symbol index
        // / reference tracker, bypassing the trigram candidate lookup and
        // content scan entirely - per the query flow, these never touch the
        // executor's line-by-line matcher.
        let mut results = if options.declaration_only {
            let symbols: Vec<_> = self
                .symbol_index
                .find_matching_name(&parsed_query.content_pattern)
                .into_iter()
                .filter(|s| passes_path_filters(s.symbol.file_id))
                .collect();
            executor.results_from_symbols(&symbols, options.max_context_lines)
        } else if options.usage_only {
            let references: Vec<_> = self
                .reference_tracker
                .find_references_by_name(&parsed_query.content_pattern)
                .into_iter()
                .filter(|r| passes_path_filters(r.source_file))
                .collect();
            executor.results_from_references(&references, options.max_context_lines)
        } else {
            let mut candidates: FxHashSet<FileId> =
                self.trigram_index.find_candidates(&parsed_query.content_pattern, options.case_insensitive);
            candidates.retain(|id| !self.deleted_set.is_deleted(*id) && passes_path_filters(*id));

            let executor_options = SearchOptions {
                case_insensitive: options.case_insensitive,
                use_regex: options.use_regex,
                max_context_lines: options.max_context_lines,
                max_results,
                declaration_only: options.declaration_only,
                usage_only: options.usage_only,
                symbol_types: options.symbol_types.clone(),
                include_pattern: options.include_pattern.clone(),
            };
            executor
                .search(&parsed_query.content_pattern, &candidates, &executor_options)
                .map_err(|e| IndexError::validation(e.to_string()))?
        };

        if !options.symbol_types.is_empty() {
            results.retain(|r| {
                r.context
                    .block_type
                    .as_deref()
                    .map(|bt| options.symbol_types.iter().any(|k| k.as_str() == bt))
                    .unwrap_or(false)
            });
        }

        let mut seen = FxHashSet::default();
        results.retain(|r| seen.insert((r.path.clone(), r.line)));
        results.truncate(max_results);

        Ok(results)
    }

    /// Declaration-only search: bypasses content scanning entirely and
    /// matches symbol names, per the `DeclarationOnly` redirect in the
    /// query flow.
    pub fn search_definitions(&self, pattern: &str) -> IndexResult<Vec<EnhancedSymbol>> {
        self.check_open()?;
        Ok(self.symbol_index.find_matching_name(pattern))
    }

    /// Usage-only search: every reference anywhere in the corpus matching
    /// `name` exactly.
    pub fn search_references(&self, name: &str) -> IndexResult<Vec<crate::model::Reference>> {
        self.check_open()?;
        Ok(self.reference_tracker.find_references_by_name(name))
    }

    pub fn search_files(&self, options: FileSearchOptions) -> IndexResult<Vec<PathBuf>> {
        self.check_open()?;
        let snapshot = self.snapshot.load();
        let mut matcher: Option<PathFilter> = None;
        let mut regex: Option<regex::Regex> = None;

        match options.match_type {
            FileMatchType::Glob => {
                matcher = Some(PathFilter::new(&[options.pattern.clone()], &[]).map_err(|e| IndexError::validation(e.to_string()))?);
            }
            FileMatchType::Regex => {
                regex = Some(regex::Regex::new(&options.pattern).map_err(|e| IndexError::validation(e.to_string()))?);
            }
            FileMatchType::Exact => {}
        }

        let mut out = Vec::new();
        for path in snapshot.paths() {
            let path_str = path.to_string_lossy();

            let matches_pattern = match options.match_type {
                FileMatchType::Glob => matcher.as_ref().map(|f| f.matches(&path_str)).unwrap_or(true),
                FileMatchType::Regex => regex.as_ref().map(|r| r.is_match(&path_str)).unwrap_or(true),
                FileMatchType::Exact => path_str == options.pattern,
            };
            if !matches_pattern {
                continue;
            }
            if !options.directories.is_empty() && !options.directories.iter().any(|d| path_str.contains(d.as_str())) {
                continue;
            }
            if !options.extensions.is_empty() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !options.extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext)) {
                    continue;
                }
            }

            out.push(path.to_path_buf());
            if out.len() >= options.max_results.max(1) {
                break;
            }
        }

        Ok(out)
    }

    pub fn find_symbols_by_name(&self, name: &str) -> IndexResult<Vec<EnhancedSymbol>> {
        self.check_open()?;
        Ok(self.symbol_index.find_by_name(name))
    }

    pub fn get_symbol_at_line(&self, file_id: FileId, line: u32) -> IndexResult<Option<CompositeSymbolId>> {
        self.check_open()?;
        Ok(self.location_index.get_symbol_at_line(file_id, line))
    }

    pub fn get_symbol_references(&self, id: CompositeSymbolId, direction: Direction) -> IndexResult<Vec<CompositeSymbolId>> {
        self.check_open()?;
        Ok(self.reference_tracker.get_symbol_references(id, direction))
    }

    pub fn generate_function_tree(&self, name: &str, max_depth: usize) -> IndexResult<Vec<FunctionTreeNode>> {
        self.check_open()?;
        Ok(self.reference_tracker.build_function_tree_by_name(&self.symbol_index, name, max_depth))
    }

    /// Cross-checks the snapshot's forward/reverse maps and reports coarse
    /// corpus metrics. A broken snapshot is always `Unhealthy`; memory
    /// pressure degrades but doesn't fail.
    pub fn health_check(&self) -> HealthReport {
        let snapshot = self.snapshot.load();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if !snapshot.is_consistent() {
            errors.push("file snapshot forward/reverse maps disagree".to_string());
        }

        let pressure = self.content_store.pressure();
        if pressure == MemoryPressure::Hard {
            errors.push("content store at hard memory ceiling".to_string());
        } else if pressure == MemoryPressure::Soft {
            warnings.push("content store approaching memory ceiling".to_string());
        }

        let status = if !errors.is_empty() {
            HealthStatus::Unhealthy
        } else if !warnings.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            errors,
            warnings,
            metrics: HealthMetrics {
                file_count: snapshot.file_count(),
                symbol_count: self.symbol_index.stats().total_symbols,
                reference_count: self.reference_tracker.stats().total_references,
                content_bytes: self.content_store.total_bytes(),
                is_indexing: self.ingest_state.load(Ordering::Acquire) == INDEXING,
            },
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
