//! Symbol index: owns every live [`Symbol`] by composite id, plus the
//! by-name and by-kind lookup structures the query API needs.

use crate::model::{CompositeSymbolId, EnhancedSymbol, FileId, Symbol, SymbolKind};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolIndexStats {
    pub total_symbols: usize,
    pub files_indexed: usize,
}

#[derive(Default)]
struct Tables {
    by_id: FxHashMap<CompositeSymbolId, EnhancedSymbol>,
    by_name: FxHashMap<String, Vec<CompositeSymbolId>>,
    by_file: FxHashMap<FileId, Vec<CompositeSymbolId>>,
}

/// Indexes every symbol definition currently known to the corpus. Writes go
/// through the integrator (single writer); reads take a shared lock, which
/// in practice is uncontended because the integrator only calls
/// `index_symbols`/`remove_file_symbols` between snapshot publishes.
pub struct SymbolIndex {
    tables: RwLock<Tables>,
    bulk_indexing: AtomicBool,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            bulk_indexing: AtomicBool::new(false),
        }
    }

    pub fn set_bulk_indexing(&self, active: bool) {
        self.bulk_indexing.store(active, Ordering::Release);
    }

    pub fn is_bulk_indexing(&self) -> bool {
        self.bulk_indexing.load(Ordering::Acquire)
    }

    /// Register every symbol parsed from a file, replacing whatever that
    /// file previously contributed.
    pub fn index_symbols(&self, file_id: FileId, symbols: Vec<Symbol>) {
        let mut tables = self.tables.write().unwrap();
        Self::remove_file_locked(&mut tables, file_id);
        let mut ids = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let id = symbol.id();
            tables.by_name.entry(symbol.name.clone()).or_default().push(id);
            tables.by_id.insert(id, EnhancedSymbol::new(symbol));
            ids.push(id);
        }
        tables.by_file.insert(file_id, ids);
    }

    pub fn remove_file_symbols(&self, file_id: FileId) {
        let mut tables = self.tables.write().unwrap();
        Self::remove_file_locked(&mut tables, file_id);
    }

    fn remove_file_locked(tables: &mut Tables, file_id: FileId) {
        if let Some(ids) = tables.by_file.remove(&file_id) {
            for id in ids {
                if let Some(enhanced) = tables.by_id.remove(&id) {
                    if let Some(bucket) = tables.by_name.get_mut(&enhanced.symbol.name) {
                        bucket.retain(|candidate| *candidate != id);
                        if bucket.is_empty() {
                            tables.by_name.remove(&enhanced.symbol.name);
                        }
                    }
                }
            }
        }
    }

    pub fn get(&self, id: CompositeSymbolId) -> Option<EnhancedSymbol> {
        self.tables.read().unwrap().by_id.get(&id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Vec<EnhancedSymbol> {
        let tables = self.tables.read().unwrap();
        tables
            .by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.by_id.get(id).cloned())
            .collect()
    }

    /// Every composite id currently live, used by the integrator's reduce
    /// phase to stamp reference counts corpus-wide without the reference
    /// tracker needing to know the symbol table's internal shape.
    pub fn all_ids(&self) -> Vec<CompositeSymbolId> {
        self.tables.read().unwrap().by_id.keys().copied().collect()
    }

    pub fn get_all_definitions(&self, file_id: FileId) -> Vec<EnhancedSymbol> {
        let tables = self.tables.read().unwrap();
        tables
            .by_file
            .get(&file_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.by_id.get(id).cloned())
            .collect()
    }

    /// Every enhanced symbol whose name contains `substring`, case-insensitive
    /// - used by `SearchDefinitions`, which matches loosely rather than
    /// requiring the exact name `find_by_name` does.
    pub fn find_matching_name(&self, substring: &str) -> Vec<EnhancedSymbol> {
        let needle = substring.to_lowercase();
        let tables = self.tables.read().unwrap();
        tables.by_id.values().filter(|e| e.symbol.name.to_lowercase().contains(&needle)).cloned().collect()
    }

    /// Top `limit` symbols by incoming reference count, descending.
    pub fn get_top_symbols(&self, limit: usize) -> Vec<EnhancedSymbol> {
        let tables = self.tables.read().unwrap();
        let mut all: Vec<EnhancedSymbol> = tables.by_id.values().cloned().collect();
        all.sort_by(|a, b| b.incoming_references.cmp(&a.incoming_references));
        all.truncate(limit);
        all
    }

    pub fn get_type_distribution(&self) -> FxHashMap<SymbolKind, usize> {
        let tables = self.tables.read().unwrap();
        let mut counts: FxHashMap<SymbolKind, usize> = FxHashMap::default();
        for enhanced in tables.by_id.values() {
            *counts.entry(enhanced.symbol.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Entry points: top-level functions with no incoming references - a
    /// heuristic proxy for "nothing else in the corpus calls this".
    pub fn get_entry_points(&self) -> Vec<EnhancedSymbol> {
        let tables = self.tables.read().unwrap();
        tables
            .by_id
            .values()
            .filter(|e| matches!(e.symbol.kind, SymbolKind::Function) && e.incoming_references == 0)
            .cloned()
            .collect()
    }

    /// Called by [`super::reference_tracker`] during `FinalizeStats` to
    /// stamp the reference counts it computed from the call graph onto each
    /// symbol. Symbol index itself never walks references.
    pub fn set_reference_counts(&self, id: CompositeSymbolId, incoming: u32, outgoing: u32) {
        let mut tables = self.tables.write().unwrap();
        if let Some(enhanced) = tables.by_id.get_mut(&id) {
            enhanced.incoming_references = incoming;
            enhanced.outgoing_references = outgoing;
        }
    }

    pub fn stats(&self) -> SymbolIndexStats {
        let tables = self.tables.read().unwrap();
        SymbolIndexStats {
            total_symbols: tables.by_id.len(),
            files_indexed: tables.by_file.len(),
        }
    }

    pub fn clear(&self) {
        let mut tables = self.tables.write().unwrap();
        *tables = Tables::default();
    }
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}
