//! File-content store: owns raw bytes and a precomputed line-offset table
//! per live [`FileId`], enforcing a soft/hard memory ceiling.

use crate::model::FileId;
use crate::utils::SystemLimits;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// A entry's signal about how close the store is to its memory ceiling,
/// returned upward so the coordinator can gate new ingest work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressure {
    Normal,
    Soft,
    Hard,
}

struct Entry {
    bytes: Vec<u8>,
    line_offsets: Vec<u32>,
}

fn compute_line_offsets(bytes: &[u8]) -> Vec<u32> {
    let mut offsets = vec![0u32];
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            offsets.push((i + 1) as u32);
        }
    }
    offsets
}

/// Owns file bytes plus a line-offset table, keyed by `FileId`. Internally
/// fine-grained (one `RwLock` over the map); the external API is read-mostly
/// so readers rarely contend with the single integrator writer.
pub struct ContentStore {
    entries: RwLock<rustc_hash::FxHashMap<FileId, Entry>>,
    total_bytes: AtomicU64,
    budget_bytes: u64,
}

impl ContentStore {
    pub fn new() -> Self {
        let budget = SystemLimits::collect().safe_content_budget_bytes();
        Self::with_budget(budget)
    }

    pub fn with_budget(budget_bytes: u64) -> Self {
        Self {
            entries: RwLock::new(rustc_hash::FxHashMap::default()),
            total_bytes: AtomicU64::new(0),
            budget_bytes,
        }
    }

    pub fn insert(&self, id: FileId, bytes: Vec<u8>) {
        let line_offsets = compute_line_offsets(&bytes);
        let len = bytes.len() as u64;
        let mut entries = self.entries.write().unwrap();
        if let Some(old) = entries.insert(id, Entry { bytes, line_offsets }) {
            self.total_bytes.fetch_sub(old.bytes.len() as u64, Ordering::Relaxed);
        }
        self.total_bytes.fetch_add(len, Ordering::Relaxed);
    }

    /// Removes an entry and releases its buffer. Used both by explicit
    /// `Invalidate` and by soft eviction under pressure.
    pub fn invalidate(&self, id: FileId) {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.remove(&id) {
            self.total_bytes.fetch_sub(entry.bytes.len() as u64, Ordering::Relaxed);
        }
    }

    pub fn get_content(&self, id: FileId) -> Option<Vec<u8>> {
        self.entries.read().unwrap().get(&id).map(|e| e.bytes.clone())
    }

    pub fn get_line(&self, id: FileId, line_idx: usize) -> Option<String> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(&id)?;
        let start = *entry.line_offsets.get(line_idx)? as usize;
        let end = entry
            .line_offsets
            .get(line_idx + 1)
            .map(|&o| o as usize)
            .unwrap_or(entry.bytes.len());
        Some(String::from_utf8_lossy(&entry.bytes[start..end.max(start)]).trim_end_matches('\n').to_string())
    }

    pub fn get_lines(&self, id: FileId, range: std::ops::Range<usize>) -> Vec<String> {
        range.filter_map(|i| self.get_line(id, i)).collect()
    }

    pub fn get_line_offsets(&self, id: FileId) -> Option<Vec<u32>> {
        self.entries.read().unwrap().get(&id).map(|e| e.line_offsets.clone())
    }

    pub fn get_line_count(&self, id: FileId) -> Option<usize> {
        self.entries.read().unwrap().get(&id).map(|e| e.line_offsets.len())
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.entries.read().unwrap().contains_key(&id)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Soft ceiling at 80% of budget, hard at 95%, per the design's content
    /// store memory policy.
    pub fn pressure(&self) -> MemoryPressure {
        let used = self.total_bytes() as f64;
        let budget = self.budget_bytes as f64;
        if budget <= 0.0 {
            return MemoryPressure::Normal;
        }
        let ratio = used / budget;
        if ratio >= 0.95 {
            MemoryPressure::Hard
        } else if ratio >= 0.80 {
            MemoryPressure::Soft
        } else {
            MemoryPressure::Normal
        }
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
        self.total_bytes.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup_round_trips() {
        let store = ContentStore::with_budget(1024 * 1024);
        let id = FileId(1);
        store.insert(id, b"fn main() {}\nfn other() {}\n".to_vec());
        assert_eq!(store.get_line_count(id), Some(2));
        assert_eq!(store.get_line(id, 0).unwrap(), "fn main() {}");
        assert_eq!(store.get_line(id, 1).unwrap(), "fn other() {}");
    }

    #[test]
    fn invalidate_releases_buffer() {
        let store = ContentStore::with_budget(1024 * 1024);
        let id = FileId(1);
        store.insert(id, b"hello".to_vec());
        assert!(store.contains(id));
        store.invalidate(id);
        assert!(!store.contains(id));
        assert_eq!(store.total_bytes(), 0);
    }

    #[test]
    fn pressure_escalates_with_usage() {
        let store = ContentStore::with_budget(100);
        store.insert(FileId(1), vec![0u8; 85]);
        assert_eq!(store.pressure(), MemoryPressure::Soft);
        store.insert(FileId(2), vec![0u8; 20]);
        assert_eq!(store.pressure(), MemoryPressure::Hard);
    }
}
