//! Location index: answers "what symbol owns this line" per file, by
//! interval search over a file's definition spans.

use crate::model::{CompositeSymbolId, FileId, Symbol};
use rustc_hash::FxHashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct LineEntry {
    id: CompositeSymbolId,
    start_line: u32,
    end_line: u32,
}

/// Per-file, sorted-by-start-line symbol spans. `get_symbol_at_line` picks
/// the innermost (smallest span) symbol covering the queried line, since
/// spans nest (a method's span sits inside its class's span).
pub struct LocationIndex {
    by_file: RwLock<FxHashMap<FileId, Vec<LineEntry>>>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self {
            by_file: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn index_file(&self, file_id: FileId, symbols: &[Symbol]) {
        let mut entries: Vec<LineEntry> = symbols
            .iter()
            .map(|s| LineEntry {
                id: s.id(),
                start_line: s.span.start_line,
                end_line: s.span.end_line,
            })
            .collect();
        entries.sort_by_key(|e| e.start_line);
        self.by_file.write().unwrap().insert(file_id, entries);
    }

    pub fn remove_file(&self, file_id: FileId) {
        self.by_file.write().unwrap().remove(&file_id);
    }

    pub fn get_symbol_at_line(&self, file_id: FileId, line: u32) -> Option<CompositeSymbolId> {
        let by_file = self.by_file.read().unwrap();
        let entries = by_file.get(&file_id)?;
        entries
            .iter()
            .filter(|e| line >= e.start_line && line <= e.end_line)
            .min_by_key(|e| e.end_line.saturating_sub(e.start_line))
            .map(|e| e.id)
    }

    pub fn clear(&self) {
        self.by_file.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.by_file.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LocationIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Span, SymbolKind};

    fn sym(ordinal: u32, kind: SymbolKind, start: u32, end: u32) -> Symbol {
        Symbol {
            file_id: FileId(1),
            ordinal,
            kind,
            name: format!("sym{ordinal}"),
            span: Span {
                start_line: start,
                start_column: 1,
                end_line: end,
                end_column: 1,
            },
            container_scope: None,
        }
    }

    #[test]
    fn picks_innermost_span_for_nested_symbols() {
        let index = LocationIndex::new();
        let class = sym(0, SymbolKind::Class, 1, 50);
        let method = sym(1, SymbolKind::Method, 10, 20);
        index.index_file(FileId(1), &[class.clone(), method.clone()]);

        let found = index.get_symbol_at_line(FileId(1), 15).unwrap();
        assert_eq!(found, method.id());

        let found_outer = index.get_symbol_at_line(FileId(1), 40).unwrap();
        assert_eq!(found_outer, class.id());
    }

    #[test]
    fn out_of_range_line_returns_none() {
        let index = LocationIndex::new();
        index.index_file(FileId(1), &[sym(0, SymbolKind::Function, 1, 5)]);
        assert!(index.get_symbol_at_line(FileId(1), 100).is_none());
    }

    #[test]
    fn remove_file_clears_its_entries() {
        let index = LocationIndex::new();
        index.index_file(FileId(1), &[sym(0, SymbolKind::Function, 1, 5)]);
        index.remove_file(FileId(1));
        assert!(index.get_symbol_at_line(FileId(1), 2).is_none());
    }
}
