//! FileScanner: walks a root directory producing a prioritized stream of
//! [`FileTask`]s onto a bounded channel, pruning excluded directories before
//! descent and sniffing binary content before it ever reaches a processor.

use crate::errors::{FileError, FileErrorKind};
use crate::model::FileTask;
use crate::parser::TreeSitterParser;
use crate::utils::{has_binary_extension, looks_binary};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::time::Duration;
use walkdir::WalkDir;

/// How many leading bytes to sniff for binary magic when a file is too large
/// to fully buffer before deciding whether it is worth parsing.
const SNIFF_BYTES: usize = 512;
const BACKPRESSURE_BASE_DELAY: Duration = Duration::from_millis(5);
const BACKPRESSURE_MAX_DELAY: Duration = Duration::from_millis(500);
const BACKPRESSURE_MAX_TOTAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_file_size: u64,
    pub max_total_size_bytes: Option<u64>,
    pub max_file_count: Option<u64>,
}

impl ScanOptions {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            include: Vec::new(),
            exclude: Vec::new(),
            max_file_size: 10 * 1024 * 1024,
            max_total_size_bytes: None,
            max_file_count: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub files_emitted: usize,
    pub files_skipped_size: usize,
    pub files_skipped_binary: usize,
    pub files_skipped_excluded: usize,
    pub total_bytes_seen: u64,
    pub errors: Vec<FileError>,
    pub aborted_memory_ceiling: bool,
}

/// Walks `options.root`, emitting [`FileTask`]s onto `tx` in priority order
/// (source languages first, then docs/config, then everything else) and
/// returning a summary once the walk completes or is cancelled.
pub struct Scanner;

impl Scanner {
    pub fn scan(options: &ScanOptions, tx: &SyncSender<FileTask>, cancel: &AtomicBool) -> ScanStats {
        let mut stats = ScanStats::default();
        let exclude_set = build_glob_set(&options.exclude);
        let include_set = build_glob_set(&options.include);
        let mut visited_dirs: HashSet<PathBuf> = HashSet::new();
        let canonical_root = options.root.canonicalize().unwrap_or_else(|_| options.root.clone());

        let walker = WalkDir::new(&options.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() {
                    return true;
                }
                if let Ok(canonical) = entry.path().canonicalize() {
                    if !canonical.starts_with(&canonical_root) {
                        // A followed symlink escaped above root; don't descend.
                        return false;
                    }
                    if !visited_dirs.insert(canonical) {
                        // Re-entered a directory already walked via a symlink
                        // cycle; skip descending again.
                        return false;
                    }
                }
                !is_excluded(entry.path(), &options.root, &exclude_set)
            });

        for entry in walker {
            if cancel.load(Ordering::Acquire) {
                break;
            }
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    stats.errors.push(FileError {
                        path: err.path().map(Path::to_path_buf).unwrap_or_default(),
                        kind: FileErrorKind::Read,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();

            if is_excluded(path, &options.root, &exclude_set) {
                stats.files_skipped_excluded += 1;
                continue;
            }
            if !include_set.as_ref().map(|set| matches(path, &options.root, set)).unwrap_or(true) {
                stats.files_skipped_excluded += 1;
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    stats.errors.push(FileError {
                        path: path.to_path_buf(),
                        kind: FileErrorKind::Read,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            if metadata.len() > options.max_file_size {
                stats.files_skipped_size += 1;
                continue;
            }

            if has_binary_extension(path) {
                stats.files_skipped_binary += 1;
                continue;
            }

            if sniffs_binary(path) {
                stats.files_skipped_binary += 1;
                continue;
            }

            stats.total_bytes_seen += metadata.len();
            if let Some(ceiling) = options.max_total_size_bytes {
                if stats.total_bytes_seen > ceiling {
                    stats.aborted_memory_ceiling = true;
                    break;
                }
            }
            if let Some(max_count) = options.max_file_count {
                if stats.files_emitted as u64 >= max_count {
                    break;
                }
            }

            let priority = task_priority(path);
            let task = FileTask { path: path.to_path_buf(), priority };
            match send_with_backpressure(tx, task, cancel) {
                Ok(()) => stats.files_emitted += 1,
                Err(SendOutcome::Cancelled) => break,
                Err(SendOutcome::Disconnected) | Err(SendOutcome::PersistentlyBlocked) => break,
            }
        }

        stats
    }
}

enum SendOutcome {
    Cancelled,
    Disconnected,
    PersistentlyBlocked,
}

/// Adaptive backpressure: retries with exponential backoff (doubling from a
/// base delay, bounded total) rather than failing outright, per the design's
/// "fatal only after persistent blockage" policy.
fn send_with_backpressure(tx: &SyncSender<FileTask>, mut task: FileTask, cancel: &AtomicBool) -> Result<(), SendOutcome> {
    let mut delay = BACKPRESSURE_BASE_DELAY;
    let mut elapsed = Duration::ZERO;
    loop {
        if cancel.load(Ordering::Acquire) {
            return Err(SendOutcome::Cancelled);
        }
        match tx.try_send(task) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Disconnected(_)) => return Err(SendOutcome::Disconnected),
            Err(TrySendError::Full(returned)) => {
                if elapsed >= BACKPRESSURE_MAX_TOTAL {
                    return Err(SendOutcome::PersistentlyBlocked);
                }
                task = returned;
                std::thread::sleep(delay);
                elapsed += delay;
                delay = (delay * 2).min(BACKPRESSURE_MAX_DELAY);
            }
        }
    }
}

fn build_glob_set(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().ok()
}

fn is_excluded(path: &Path, root: &Path, exclude_set: &Option<GlobSet>) -> bool {
    match exclude_set {
        Some(set) => matches(path, root, set),
        None => false,
    }
}

fn matches(path: &Path, root: &Path, set: &GlobSet) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    set.is_match(relative) || set.is_match(path)
}

/// Sniff the first bytes of a file that passed the extension check, catching
/// binaries (fonts, archives renamed with a misleading extension) that
/// `has_binary_extension` alone would miss.
fn sniffs_binary(path: &Path) -> bool {
    use std::io::Read;
    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let mut buf = [0u8; SNIFF_BYTES];
    let Ok(n) = file.read(&mut buf) else {
        return false;
    };
    looks_binary(&buf[..n])
}

/// Source languages the parser recognizes sort first; common docs/config
/// extensions next; everything else last.
fn task_priority(path: &Path) -> u8 {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if TreeSitterParser::supports_extension(ext) {
        0
    } else if matches!(ext, "md" | "toml" | "json" | "yaml" | "yml" | "txt" | "cfg" | "ini") {
        1
    } else {
        2
    }
}
