//! Cross-file reference tracking: resolves each [`Reference`] against the
//! symbol name table, tracks per-symbol incoming/outgoing edges for the call
//! graph, and answers the file-level "what does this file import" query that
//! the teacher's standalone dependency-ranking index used to own (folded in
//! here - the design names one reference-tracking collaborator, not two).
//! Quoted C/C++ `#include "..."` references get a separate heuristic pass
//! against the file snapshot's path table rather than the symbol table,
//! since an include names a file, not a symbol.

use crate::index::snapshot::FileSnapshot;
use crate::index::symbol_index::SymbolIndex;
use crate::model::{CompositeSymbolId, FileId, Quality, Reference, ReferenceKind, Resolution};
use rustc_hash::FxHashMap;
use std::sync::RwLock;

/// Sentinel ordinal marking a [`CompositeSymbolId`] that names a whole file
/// rather than one of its symbols - used only by heuristic include
/// resolution, which has no symbol to point at.
const FILE_LEVEL_ORDINAL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceTrackerStats {
    pub total_references: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub ambiguous: usize,
}

#[derive(Default)]
struct Tables {
    by_file: FxHashMap<FileId, Vec<Reference>>,
    /// target symbol -> references that resolved to it
    incoming: FxHashMap<CompositeSymbolId, Vec<CompositeSymbolId>>,
}

/// Owns every [`Reference`] the corpus has produced, resolved or not.
/// `ProcessFile` resolves what it can immediately (single-candidate exact
/// name matches); `ProcessAllReferences` is a corpus-wide re-resolution pass
/// run during the debounced rebuild, since a reference can only resolve once
/// its target file has itself been indexed.
pub struct ReferenceTracker {
    tables: RwLock<Tables>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Resolve `references` against `symbol_index` and store them, replacing
    /// whatever `file_id` previously contributed. Resolution here is
    /// best-effort and immediate; call `process_all_references` afterward
    /// for a corpus-wide pass that catches forward references. `snapshot` is
    /// the path table used for heuristic include resolution.
    pub fn process_file(&self, symbol_index: &SymbolIndex, snapshot: &FileSnapshot, file_id: FileId, mut references: Vec<Reference>) {
        for reference in &mut references {
            resolve(symbol_index, snapshot, reference);
        }
        let mut tables = self.tables.write().unwrap();
        Self::remove_file_locked(&mut tables, file_id);
        for reference in &references {
            if let Resolution::Resolved(target) = reference.resolution {
                let source = CompositeSymbolId::new(reference.source_file, 0);
                tables.incoming.entry(target).or_default().push(source);
            }
        }
        tables.by_file.insert(file_id, references);
    }

    /// Re-resolve every stored reference against the current symbol table.
    /// Run by the debounced rebuilder after a batch of files settles, so
    /// references that pointed at not-yet-indexed symbols get a second shot -
    /// including quoted includes whose target file only just got indexed.
    pub fn process_all_references(&self, symbol_index: &SymbolIndex, snapshot: &FileSnapshot) {
        let mut tables = self.tables.write().unwrap();
        let mut incoming: FxHashMap<CompositeSymbolId, Vec<CompositeSymbolId>> = FxHashMap::default();
        for (file_id, references) in tables.by_file.iter_mut() {
            for reference in references.iter_mut() {
                resolve(symbol_index, snapshot, reference);
                if let Resolution::Resolved(target) = reference.resolution {
                    incoming
                        .entry(target)
                        .or_default()
                        .push(CompositeSymbolId::new(*file_id, 0));
                }
            }
        }
        tables.incoming = incoming;
    }

    pub fn remove_file(&self, file_id: FileId) {
        let mut tables = self.tables.write().unwrap();
        Self::remove_file_locked(&mut tables, file_id);
    }

    fn remove_file_locked(tables: &mut Tables, file_id: FileId) {
        tables.by_file.remove(&file_id);
        for sources in tables.incoming.values_mut() {
            sources.retain(|s| s.file_id != file_id);
        }
    }

    /// References incoming to (or outgoing from, per `direction`) `symbol`.
    pub fn get_symbol_references(&self, symbol: CompositeSymbolId, direction: Direction) -> Vec<CompositeSymbolId> {
        let tables = self.tables.read().unwrap();
        match direction {
            Direction::Incoming => tables.incoming.get(&symbol).cloned().unwrap_or_default(),
            Direction::Outgoing => tables
                .by_file
                .get(&symbol.file_id)
                .into_iter()
                .flatten()
                .filter_map(|r| match r.resolution {
                    Resolution::Resolved(target) => Some(target),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn get_file_references(&self, file_id: FileId) -> Vec<Reference> {
        self.tables.read().unwrap().by_file.get(&file_id).cloned().unwrap_or_default()
    }

    /// Imports and includes recorded for `file_id` - the part of the old
    /// dependency index this tracker absorbed.
    pub fn get_file_imports(&self, file_id: FileId) -> Vec<String> {
        self.tables
            .read()
            .unwrap()
            .by_file
            .get(&file_id)
            .into_iter()
            .flatten()
            .filter(|r| matches!(r.kind, ReferenceKind::Import | ReferenceKind::Include))
            .map(|r| r.referenced_name.clone())
            .collect()
    }

    /// Every reference anywhere in the corpus whose `referenced_name`
    /// matches `name` exactly, used by `SearchReferences`.
    pub fn find_references_by_name(&self, name: &str) -> Vec<Reference> {
        let tables = self.tables.read().unwrap();
        tables.by_file.values().flatten().filter(|r| r.referenced_name == name).cloned().collect()
    }

    /// Caller/callee tree rooted at every symbol named `name`, expanded
    /// breadth-first up to `max_depth` hops through the call graph.
    pub fn build_function_tree_by_name(
        &self,
        symbol_index: &SymbolIndex,
        name: &str,
        max_depth: usize,
    ) -> Vec<FunctionTreeNode> {
        symbol_index
            .find_by_name(name)
            .into_iter()
            .map(|enhanced| self.build_tree(enhanced.symbol.id(), max_depth, &mut std::collections::HashSet::new()))
            .collect()
    }

    fn build_tree(
        &self,
        root: CompositeSymbolId,
        depth_remaining: usize,
        visited: &mut std::collections::HashSet<CompositeSymbolId>,
    ) -> FunctionTreeNode {
        visited.insert(root);
        let callees = if depth_remaining == 0 {
            Vec::new()
        } else {
            self.get_symbol_references(root, Direction::Outgoing)
                .into_iter()
                .filter(|callee| !visited.contains(callee))
                .map(|callee| self.build_tree(callee, depth_remaining - 1, visited))
                .collect()
        };
        FunctionTreeNode { symbol: root, callees }
    }

    pub fn stats(&self) -> ReferenceTrackerStats {
        let tables = self.tables.read().unwrap();
        let mut stats = ReferenceTrackerStats::default();
        for references in tables.by_file.values() {
            for r in references {
                stats.total_references += 1;
                match r.resolution {
                    Resolution::Resolved(_) => stats.resolved += 1,
                    Resolution::Unresolved => stats.unresolved += 1,
                    Resolution::Ambiguous => stats.ambiguous += 1,
                }
            }
        }
        stats
    }

    pub fn clear(&self) {
        let mut tables = self.tables.write().unwrap();
        *tables = Tables::default();
    }
}

impl Default for ReferenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionTreeNode {
    pub symbol: CompositeSymbolId,
    pub callees: Vec<FunctionTreeNode>,
}

/// Resolve a single reference's name against the symbol table: zero matches
/// is `Unresolved`, exactly one is `Resolved` with `Quality::Exact`, and more
/// than one is `Ambiguous` with every candidate recorded so the caller can
/// disambiguate by context. `Import` references name a module/path, not a
/// symbol, and are never resolved here; `Include` references get their own
/// file-path heuristic.
fn resolve(symbol_index: &SymbolIndex, snapshot: &FileSnapshot, reference: &mut Reference) {
    match reference.kind {
        ReferenceKind::Import => return,
        ReferenceKind::Include => return resolve_include(snapshot, reference),
        _ => {}
    }
    let candidates = symbol_index.find_by_name(&reference.referenced_name);
    match candidates.len() {
        0 => {
            reference.resolution = Resolution::Unresolved;
            reference.quality = None;
            reference.candidates.clear();
            reference.failure_reason = Some(format!("no symbol named `{}`", reference.referenced_name));
        }
        1 => {
            reference.resolution = Resolution::Resolved(candidates[0].symbol.id());
            reference.quality = Some(Quality::Exact);
            reference.candidates.clear();
            reference.failure_reason = None;
        }
        _ => {
            reference.candidates = candidates.iter().map(|c| c.symbol.id()).collect();
            reference.resolution = Resolution::Ambiguous;
            reference.quality = Some(Quality::Heuristic);
            reference.failure_reason = Some(format!("{} symbols named `{}`", candidates.len(), reference.referenced_name));
        }
    }
}

/// Heuristic resolution for a quoted C/C++ `#include "..."`: match the
/// include's filename against every indexed file's basename. There is no
/// symbol to point at, so a match is recorded as a [`CompositeSymbolId`]
/// with [`FILE_LEVEL_ORDINAL`] naming the whole file.
fn resolve_include(snapshot: &FileSnapshot, reference: &mut Reference) {
    let wanted = std::path::Path::new(&reference.referenced_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(reference.referenced_name.as_str());

    let matches: Vec<FileId> = snapshot
        .paths()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some(wanted))
        .filter_map(|p| snapshot.get_id(p))
        .collect();

    match matches.len() {
        0 => {
            reference.resolution = Resolution::Unresolved;
            reference.quality = None;
            reference.candidates.clear();
            reference.failure_reason = Some(format!("no file named `{wanted}` in corpus"));
        }
        1 => {
            reference.resolution = Resolution::Resolved(CompositeSymbolId::new(matches[0], FILE_LEVEL_ORDINAL));
            reference.quality = Some(Quality::Heuristic);
            reference.candidates.clear();
            reference.failure_reason = None;
        }
        _ => {
            reference.candidates = matches.iter().map(|id| CompositeSymbolId::new(*id, FILE_LEVEL_ORDINAL)).collect();
            reference.resolution = Resolution::Ambiguous;
            reference.quality = Some(Quality::Heuristic);
            reference.failure_reason = Some(format!("{} files named `{wanted}` in corpus", matches.len()));
        }
    }
}
