//! The set of `FileId`s that have been deleted but may still be referenced
//! by in-flight query results (invariant #2: a query never returns a
//! deleted file, but other sub-indexes may lag a tick behind the snapshot
//! publish). Every query path consults this before trusting a `FileId`.

use crate::model::FileId;
use rustc_hash::FxHashSet;
use std::sync::RwLock;

pub struct DeletedSet {
    ids: RwLock<FxHashSet<FileId>>,
}

impl DeletedSet {
    pub fn new() -> Self {
        Self {
            ids: RwLock::new(FxHashSet::default()),
        }
    }

    pub fn mark_deleted(&self, id: FileId) {
        self.ids.write().unwrap().insert(id);
    }

    pub fn is_deleted(&self, id: FileId) -> bool {
        self.ids.read().unwrap().contains(&id)
    }

    /// Called once a `FileId` is fully reclaimed (all sub-indexes have
    /// dropped it) so the set doesn't grow unbounded over a long-running
    /// process.
    pub fn reclaim(&self, id: FileId) {
        self.ids.write().unwrap().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.ids.write().unwrap().clear();
    }
}

impl Default for DeletedSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_id_is_reported_deleted_until_reclaimed() {
        let set = DeletedSet::new();
        let id = FileId(1);
        assert!(!set.is_deleted(id));
        set.mark_deleted(id);
        assert!(set.is_deleted(id));
        set.reclaim(id);
        assert!(!set.is_deleted(id));
    }
}
