//! Utility functions shared across modules: path normalization, binary
//! detection, encoding transcoding, and system memory limits.

use std::path::Path;
use std::sync::OnceLock;

/// Normalize a path string for cross-platform comparison.
///
/// Converts all path separators to forward slashes and lowercases the path,
/// so config-supplied paths compare leniently regardless of platform.
///
/// ```
/// use codeloom::utils::normalize_path_for_comparison;
///
/// assert_eq!(normalize_path_for_comparison("C:\\Users\\Dev"), "c:/users/dev");
/// assert_eq!(normalize_path_for_comparison("/home/dev"), "/home/dev");
/// ```
pub fn normalize_path_for_comparison(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// Extensions that are never worth attempting to parse or trigram-index.
pub fn get_binary_extensions() -> &'static [&'static str] {
    &[
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "svg", "zip", "tar", "gz",
        "bz2", "xz", "7z", "rar", "exe", "dll", "so", "dylib", "a", "lib", "o", "obj", "bin",
        "dat", "db", "sqlite", "sqlite3", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
        "mp3", "mp4", "avi", "mov", "mkv", "wav", "flac", "ogg", "ttf", "otf", "woff", "woff2",
        "class", "jar", "wasm", "pyc", "node",
    ]
}

pub fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| get_binary_extensions().contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sniff the first `N` bytes of a buffer for common binary magic signatures
/// or NUL bytes, which text source files essentially never contain.
pub fn looks_binary(prefix: &[u8]) -> bool {
    const MAGIC: &[&[u8]] = &[
        b"\x89PNG", b"GIF8", b"\xFF\xD8\xFF", b"PK\x03\x04", b"\x7FELF", b"MZ", b"%PDF",
    ];
    if MAGIC.iter().any(|m| prefix.starts_with(m)) {
        return true;
    }
    prefix.contains(&0u8)
}

/// Attempt to transcode a non-UTF8 byte buffer to UTF-8, detecting encoding
/// with `chardetng` and decoding with `encoding_rs`. Returns `None` if the
/// detected encoding still fails to decode cleanly.
pub fn transcode_to_utf8(bytes: &[u8]) -> Option<(String, &'static encoding_rs::Encoding)> {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (cow, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return None;
    }
    Some((cow.into_owned(), encoding))
}

/// Coarse system limits used to decide how many files can be safely memory-mapped
/// before falling back to owned buffers.
#[derive(Debug, Clone, Copy)]
pub struct SystemLimits {
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
}

static SYSTEM_LIMITS: OnceLock<SystemLimits> = OnceLock::new();

impl SystemLimits {
    pub fn collect() -> Self {
        *SYSTEM_LIMITS.get_or_init(|| {
            let mut sys = sysinfo::System::new();
            sys.refresh_memory();
            Self {
                total_memory_bytes: sys.total_memory(),
                available_memory_bytes: sys.available_memory(),
            }
        })
    }

    /// A conservative ceiling on how many bytes of mapped/owned content the
    /// process should hold at once. Used by the content store's soft/hard
    /// reclamation ceilings.
    pub fn safe_content_budget_bytes(&self) -> u64 {
        (self.available_memory_bytes / 2).max(64 * 1024 * 1024)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 bytes".to_string();
    }
    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    let mut value = bytes as f64;
    let mut unit_idx = 0;
    while value >= 1024.0 && unit_idx < UNITS.len() - 1 {
        value /= 1024.0;
        unit_idx += 1;
    }
    format!("{:.2} {}", value, UNITS[unit_idx])
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.chars().rev().collect()
}
