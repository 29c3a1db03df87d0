//! Sharded trigram posting storage.
//!
//! Postings for a 24-bit trigram key are spread across a fixed, power-of-two
//! number of buckets (default 256), each independently locked. This is what
//! lets the [`super::merger`] fan-out pipeline have `M` workers mutate
//! disjoint buckets with no shared lock between them, and what lets
//! [`ShardedTrigramIndex::find_candidates`] intersect posting lists without a
//! single global lock serializing every query.

use crate::model::{FileId, FileLocation};
use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

pub const DEFAULT_BUCKET_COUNT: usize = 256;

/// A 3-byte substring used as a content-search key. Packed into 24 bits
/// conceptually; stored as the raw 3 bytes for simplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trigram([u8; 3]);

impl Trigram {
    pub fn new(bytes: [u8; 3]) -> Self {
        Trigram(bytes)
    }

    pub fn as_bytes(self) -> [u8; 3] {
        self.0
    }

    fn bucket(self, bucket_count: usize) -> usize {
        let mut hasher = rustc_hash::FxHasher::default();
        self.0.hash(&mut hasher);
        (hasher.finish() as usize) % bucket_count
    }
}

/// Extract all (non-unique) trigrams from `text`, in order.
pub fn extract_trigrams(text: &str) -> Vec<Trigram> {
    let bytes = text.as_bytes();
    let len = bytes.len().saturating_sub(2);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(Trigram([bytes[i], bytes[i + 1], bytes[i + 2]]));
    }
    out
}

/// A per-file set of trigrams grouped by destination bucket, with the byte
/// offset of (one occurrence of) each trigram. Computed once by a processor
/// worker and handed to either the trigram index directly or the merger
/// pipeline, per the design's two submission paths.
#[derive(Debug, Clone, Default)]
pub struct BucketedTrigrams {
    pub bucket_count: usize,
    pub buckets: Vec<Vec<(Trigram, u32)>>,
}

impl BucketedTrigrams {
    pub fn compute(content: &[u8], bucket_count: usize) -> Self {
        let mut seen: FxHashSet<Trigram> = FxHashSet::default();
        let mut buckets: Vec<Vec<(Trigram, u32)>> = vec![Vec::new(); bucket_count];
        let len = content.len().saturating_sub(2);
        for i in 0..len {
            let t = Trigram([content[i], content[i + 1], content[i + 2]]);
            if seen.insert(t) {
                let b = t.bucket(bucket_count);
                buckets[b].push((t, i as u32));
            }
        }
        Self { bucket_count, buckets }
    }
}

#[derive(Default)]
struct Bucket {
    postings: FxHashMap<Trigram, Vec<FileLocation>>,
}

/// Fixed bucket-count trigram posting store. Each bucket has its own lock;
/// `find_candidates` intersects across trigrams, not across buckets, so a
/// query only ever touches the buckets its query trigrams happen to land in.
pub struct ShardedTrigramIndex {
    buckets: Vec<Mutex<Bucket>>,
}

impl ShardedTrigramIndex {
    pub fn new(bucket_count: usize) -> Self {
        let mut buckets = Vec::with_capacity(bucket_count);
        for _ in 0..bucket_count {
            buckets.push(Mutex::new(Bucket::default()));
        }
        Self { buckets }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Merge only bucket `bucket_idx` of `bucketed` for `file_id`. The
    /// merger pipeline calls this with each worker's assigned bucket range;
    /// a direct (non-merger) submission calls it once per populated bucket.
    pub fn merge_bucket(&self, file_id: FileId, bucket_idx: usize, entries: &[(Trigram, u32)]) {
        let mut bucket = self.buckets[bucket_idx].lock().unwrap();
        for (trigram, offset) in entries {
            bucket
                .postings
                .entry(*trigram)
                .or_default()
                .push(FileLocation { file_id, offset: *offset });
        }
    }

    /// Submit every populated bucket of `bucketed` directly (bypassing the
    /// merger pipeline) - the path used when the corpus is small enough that
    /// fan-out isn't worth the channel overhead.
    pub fn add_file_direct(&self, file_id: FileId, bucketed: &BucketedTrigrams) {
        for (idx, entries) in bucketed.buckets.iter().enumerate() {
            if !entries.is_empty() {
                self.merge_bucket(file_id, idx, entries);
            }
        }
    }

    /// Re-extract trigrams from `old_content` and remove this file's
    /// postings for each. Used on update/remove before new content (if any)
    /// is inserted.
    pub fn remove_file(&self, file_id: FileId, old_content: &[u8]) {
        let bucket_count = self.buckets.len();
        let bucketed = BucketedTrigrams::compute(old_content, bucket_count);
        for (idx, entries) in bucketed.buckets.iter().enumerate() {
            if entries.is_empty() {
                continue;
            }
            let mut bucket = self.buckets[idx].lock().unwrap();
            for (trigram, _) in entries {
                if let Some(locations) = bucket.postings.get_mut(trigram) {
                    locations.retain(|loc| loc.file_id != file_id);
                    if locations.is_empty() {
                        bucket.postings.remove(trigram);
                    }
                }
            }
        }
    }

    /// Extract trigrams from `pattern` (folding case if requested) and
    /// intersect their posting lists, returning the set of file IDs that
    /// might contain the pattern. Callers must re-verify with a direct
    /// content scan; this is a candidate filter, not a match.
    pub fn find_candidates(&self, pattern: &str, case_insensitive: bool) -> FxHashSet<FileId> {
        let variants: Vec<String> = if case_insensitive {
            vec![pattern.to_lowercase(), pattern.to_uppercase(), pattern.to_string()]
        } else {
            vec![pattern.to_string()]
        };

        let mut query_trigrams: FxHashSet<Trigram> = FxHashSet::default();
        for variant in &variants {
            for t in extract_trigrams(variant) {
                query_trigrams.insert(t);
            }
        }

        if query_trigrams.is_empty() {
            return FxHashSet::default();
        }

        let mut sets: Vec<FxHashSet<FileId>> = Vec::with_capacity(query_trigrams.len());
        for trigram in &query_trigrams {
            let bucket = self.buckets[trigram.bucket(self.buckets.len())].lock().unwrap();
            match bucket.postings.get(trigram) {
                Some(locations) => {
                    sets.push(locations.iter().map(|l| l.file_id).collect());
                }
                None if case_insensitive => {
                    // A folded variant may legitimately miss; skip it rather
                    // than zeroing out the whole query.
                    continue;
                }
                None => return FxHashSet::default(),
            }
        }

        if sets.is_empty() {
            return FxHashSet::default();
        }
        sets.sort_by_key(|s| s.len());
        let mut result = sets[0].clone();
        for s in &sets[1..] {
            result.retain(|id| s.contains(id));
            if result.is_empty() {
                break;
            }
        }
        result
    }

    pub fn num_trigrams(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.lock().unwrap().postings.len())
            .sum()
    }

    pub fn clear(&self) {
        for bucket in &self.buckets {
            bucket.lock().unwrap().postings.clear();
        }
    }
}

impl Default for ShardedTrigramIndex {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_add_then_find() {
        let index = ShardedTrigramIndex::new(16);
        let bucketed = BucketedTrigrams::compute(b"hello world", 16);
        index.add_file_direct(FileId(1), &bucketed);

        let found = index.find_candidates("hello", false);
        assert!(found.contains(&FileId(1)));

        let not_found = index.find_candidates("xyz123", false);
        assert!(not_found.is_empty());
    }

    #[test]
    fn remove_file_clears_its_postings() {
        let index = ShardedTrigramIndex::new(16);
        let content = b"unique_needle_text";
        let bucketed = BucketedTrigrams::compute(content, 16);
        index.add_file_direct(FileId(1), &bucketed);
        assert!(index.find_candidates("needle", false).contains(&FileId(1)));

        index.remove_file(FileId(1), content);
        assert!(index.find_candidates("needle", false).is_empty());
    }

    #[test]
    fn case_insensitive_search_finds_either_case() {
        let index = ShardedTrigramIndex::new(16);
        let bucketed = BucketedTrigrams::compute(b"Hello World", 16);
        index.add_file_direct(FileId(7), &bucketed);
        assert!(index.find_candidates("hello", true).contains(&FileId(7)));
    }
}
