//! The copy-on-write file snapshot: the one structure every query reads
//! without taking a lock.
//!
//! A [`FileSnapshot`] is an immutable triple of maps (path→FileId,
//! FileId→path, FileId→scope hierarchy). Writers build a new snapshot that
//! shares the maps they didn't touch, then publish it with a single
//! `arc_swap::ArcSwap` store; readers call [`SnapshotHandle::load`] and never
//! block on a writer. A lightweight mutex serializes writers so two
//! concurrent mutations can't race to publish a stale snapshot over a newer
//! one.

use crate::model::{FileId, Scope};
use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One immutable, shareable snapshot of the path↔FileId bijection plus each
/// live file's scope hierarchy.
#[derive(Debug, Default)]
pub struct FileSnapshot {
    pub path_to_id: Arc<FxHashMap<PathBuf, FileId>>,
    pub id_to_path: Arc<FxHashMap<FileId, PathBuf>>,
    pub id_to_scopes: Arc<FxHashMap<FileId, Arc<Vec<Scope>>>>,
}

impl FileSnapshot {
    pub fn file_count(&self) -> usize {
        self.id_to_path.len()
    }

    pub fn get_id(&self, path: &Path) -> Option<FileId> {
        self.path_to_id.get(path).copied()
    }

    pub fn get_path(&self, id: FileId) -> Option<&Path> {
        self.id_to_path.get(&id).map(|p| p.as_path())
    }

    /// Every live path currently in the snapshot, in no particular order -
    /// used by `SearchFiles` to scan the whole corpus rather than a
    /// trigram-filtered subset.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.id_to_path.values().map(|p| p.as_path())
    }

    /// Invariant #1: the forward and reverse maps are mutually inverse.
    pub fn is_consistent(&self) -> bool {
        if self.path_to_id.len() != self.id_to_path.len() {
            return false;
        }
        self.path_to_id
            .iter()
            .all(|(path, id)| self.id_to_path.get(id).map(|p| p == path).unwrap_or(false))
    }
}

/// Holds the published [`FileSnapshot`] behind an `ArcSwap` (lock-free reads)
/// and a `Mutex` that serializes the read-modify-publish cycle for writers.
pub struct SnapshotHandle {
    current: ArcSwap<FileSnapshot>,
    writer_lock: Mutex<()>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(FileSnapshot::default()),
            writer_lock: Mutex::new(()),
        }
    }

    /// Lock-free read of the currently published snapshot.
    pub fn load(&self) -> Arc<FileSnapshot> {
        self.current.load_full()
    }

    /// Run `mutate` under the writer lock, starting from a clone of the
    /// current snapshot's Arc-shared fields, then publish the result with a
    /// single atomic store. `mutate` receives a [`SnapshotBuilder`] seeded
    /// from the published snapshot so untouched fields are shared, not
    /// copied (copy-on-write).
    pub fn publish(&self, mutate: impl FnOnce(&mut SnapshotBuilder)) {
        let _guard = self.writer_lock.lock().unwrap();
        let base = self.current.load_full();
        let mut builder = SnapshotBuilder::from_base(&base);
        mutate(&mut builder);
        self.current.store(Arc::new(builder.build()));
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable working copy used while building the next snapshot. Cloning the
/// `Arc`-wrapped maps is O(1); an actual copy only happens the first time a
/// given map is mutated (`Arc::make_mut`).
pub struct SnapshotBuilder {
    path_to_id: Arc<FxHashMap<PathBuf, FileId>>,
    id_to_path: Arc<FxHashMap<FileId, PathBuf>>,
    id_to_scopes: Arc<FxHashMap<FileId, Arc<Vec<Scope>>>>,
}

impl SnapshotBuilder {
    fn from_base(base: &FileSnapshot) -> Self {
        Self {
            path_to_id: base.path_to_id.clone(),
            id_to_path: base.id_to_path.clone(),
            id_to_scopes: base.id_to_scopes.clone(),
        }
    }

    pub fn insert_file(&mut self, path: PathBuf, id: FileId, scopes: Vec<Scope>) {
        Arc::make_mut(&mut self.path_to_id).insert(path.clone(), id);
        Arc::make_mut(&mut self.id_to_path).insert(id, path);
        Arc::make_mut(&mut self.id_to_scopes).insert(id, Arc::new(scopes));
    }

    pub fn remove_file(&mut self, id: FileId) {
        if let Some(path) = self.id_to_path.get(&id).cloned() {
            Arc::make_mut(&mut self.path_to_id).remove(&path);
        }
        Arc::make_mut(&mut self.id_to_path).remove(&id);
        Arc::make_mut(&mut self.id_to_scopes).remove(&id);
    }

    pub fn clear(&mut self) {
        *Arc::make_mut(&mut self.path_to_id) = FxHashMap::default();
        *Arc::make_mut(&mut self.id_to_path) = FxHashMap::default();
        *Arc::make_mut(&mut self.id_to_scopes) = FxHashMap::default();
    }

    fn build(self) -> FileSnapshot {
        FileSnapshot {
            path_to_id: self.path_to_id,
            id_to_path: self.id_to_path,
            id_to_scopes: self.id_to_scopes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScopeKind, Span};

    fn scope(file: FileId) -> Vec<Scope> {
        vec![Scope {
            file_id: file,
            ordinal: 0,
            kind: ScopeKind::File,
            span: Span::point(1, 1),
            parent: None,
        }]
    }

    #[test]
    fn insert_then_remove_keeps_forward_reverse_inverse() {
        let handle = SnapshotHandle::new();
        let id = FileId(1);
        let path = PathBuf::from("/a.rs");
        handle.publish(|b| b.insert_file(path.clone(), id, scope(id)));

        let snap = handle.load();
        assert_eq!(snap.get_id(&path), Some(id));
        assert_eq!(snap.get_path(id), Some(path.as_path()));
        assert!(snap.is_consistent());

        handle.publish(|b| b.remove_file(id));
        let snap2 = handle.load();
        assert_eq!(snap2.get_id(&path), None);
        assert!(snap2.is_consistent());
    }

    #[test]
    fn readers_never_observe_a_partial_publish() {
        let handle = Arc::new(SnapshotHandle::new());
        for i in 0..20u32 {
            handle.publish(|b| b.insert_file(PathBuf::from(format!("/f{i}.rs")), FileId(i), scope(FileId(i))));
        }
        let snap = handle.load();
        assert_eq!(snap.file_count(), 20);
        assert!(snap.is_consistent());
    }
}
