//! Search executor: turns a set of trigram-filtered candidate [`FileId`]s
//! into scored, context-enriched [`SearchResult`]s.
//!
//! The trigram index only tells the coordinator which files *might* contain
//! a match; this is the verification step that actually scans each
//! candidate's content, confirms the hit, and enriches it with the enclosing
//! symbol (via the location index) before the coordinator deduplicates and
//! truncates the result list.

use crate::index::content_store::ContentStore;
use crate::index::location_index::LocationIndex;
use crate::index::snapshot::FileSnapshot;
use crate::index::symbol_index::SymbolIndex;
use crate::model::{EnhancedSymbol, FileId, Reference, SymbolKind};
use crate::search::regex_search::RegexAnalysis;
use rustc_hash::FxHashSet;
use std::path::PathBuf;

/// Query-time knobs, matching the external `SearchWithOptions` surface.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub case_insensitive: bool,
    pub use_regex: bool,
    pub max_context_lines: usize,
    pub max_results: usize,
    pub declaration_only: bool,
    pub usage_only: bool,
    pub symbol_types: Vec<SymbolKind>,
    pub include_pattern: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            use_regex: false,
            max_context_lines: 2,
            max_results: 100,
            declaration_only: false,
            usage_only: false,
            symbol_types: Vec::new(),
            include_pattern: None,
        }
    }
}

/// The lines immediately surrounding a hit, plus the enclosing definition if
/// the location index has one on record for that line.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub lines: Vec<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub block_type: Option<String>,
    pub block_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub path: PathBuf,
    pub file_id: FileId,
    pub line: u32,
    pub column: u32,
    pub context: SearchContext,
    pub score: f32,
    pub relational_data: Option<serde_json::Value>,
}

/// Borrows the sub-indexes it needs for one query; built fresh per call by
/// the coordinator rather than held long-term, since it never outlives the
/// snapshot it was handed.
pub struct SearchExecutor<'a> {
    pub content_store: &'a ContentStore,
    pub location_index: &'a LocationIndex,
    pub symbol_index: &'a SymbolIndex,
    pub snapshot: &'a FileSnapshot,
}

impl<'a> SearchExecutor<'a> {
    /// Scan every candidate's content for `pattern`, returning one
    /// [`SearchResult`] per confirmed hit. Callers are responsible for
    /// deduplicating by `(path, line)` and truncating to `max_results` -
    /// this only produces the raw hit stream for one candidate set.
    pub fn search(&self, pattern: &str, candidates: &FxHashSet<FileId>, options: &SearchOptions) -> anyhow::Result<Vec<SearchResult>> {
        let regex = if options.use_regex {
            let effective = if options.case_insensitive && !pattern.starts_with("(?i)") {
                format!("(?i){pattern}")
            } else {
                pattern.to_string()
            };
            Some(RegexAnalysis::analyze(&effective)?)
        } else {
            None
        };

        let mut sorted: Vec<FileId> = candidates.iter().copied().collect();
        sorted.sort_by_key(|id| id.as_u32());

        let mut results = Vec::new();
        for file_id in sorted {
            let Some(path) = self.snapshot.get_path(file_id) else {
                continue;
            };
            let Some(line_count) = self.content_store.get_line_count(file_id) else {
                continue;
            };

            for line_idx in 0..line_count {
                let Some(line_text) = self.content_store.get_line(file_id, line_idx) else {
                    continue;
                };
                let Some((column, occurrences)) = match_line(&line_text, pattern, options.case_insensitive, regex.as_ref()) else {
                    continue;
                };

                let line_number = (line_idx + 1) as u32;
                results.push(SearchResult {
                    path: path.to_path_buf(),
                    file_id,
                    line: line_number,
                    column,
                    context: self.build_context(file_id, line_idx, line_count, options.max_context_lines),
                    score: occurrences as f32,
                    relational_data: None,
                });

                if results.len() >= options.max_results.saturating_mul(4).max(options.max_results) {
                    // Cap per-candidate-set scanning generously above the
                    // caller's requested result count; the coordinator
                    // truncates precisely after dedup.
                    return Ok(results);
                }
            }
        }

        Ok(results)
    }

    /// `DeclarationOnly` redirect: build one [`SearchResult`] per definition
    /// site rather than scanning content, so a declaration query costs a
    /// symbol-table lookup instead of a per-candidate content scan.
    pub fn results_from_symbols(&self, symbols: &[EnhancedSymbol], max_context_lines: usize) -> Vec<SearchResult> {
        let mut results = Vec::with_capacity(symbols.len());
        for enhanced in symbols {
            let symbol = &enhanced.symbol;
            let Some(path) = self.snapshot.get_path(symbol.file_id) else {
                continue;
            };
            let Some(line_count) = self.content_store.get_line_count(symbol.file_id) else {
                continue;
            };
            let line_idx = symbol.span.start_line.saturating_sub(1) as usize;
            results.push(SearchResult {
                path: path.to_path_buf(),
                file_id: symbol.file_id,
                line: symbol.span.start_line,
                column: symbol.span.start_column,
                context: self.build_context(symbol.file_id, line_idx, line_count, max_context_lines),
                score: (enhanced.incoming_references + 1) as f32,
                relational_data: None,
            });
        }
        results
    }

    /// `UsageOnly` redirect: build one [`SearchResult`] per recorded
    /// reference rather than scanning content, mirroring the declaration
    /// path but sourced from the reference tracker.
    pub fn results_from_references(&self, references: &[Reference], max_context_lines: usize) -> Vec<SearchResult> {
        let mut results = Vec::with_capacity(references.len());
        for reference in references {
            let Some(path) = self.snapshot.get_path(reference.source_file) else {
                continue;
            };
            let Some(line_count) = self.content_store.get_line_count(reference.source_file) else {
                continue;
            };
            let line_idx = reference.line.saturating_sub(1) as usize;
            results.push(SearchResult {
                path: path.to_path_buf(),
                file_id: reference.source_file,
                line: reference.line,
                column: reference.column,
                context: self.build_context(reference.source_file, line_idx, line_count, max_context_lines),
                score: if reference.is_resolved() { 1.0 } else { 0.5 },
                relational_data: None,
            });
        }
        results
    }

    fn build_context(&self, file_id: FileId, line_idx: usize, line_count: usize, max_context_lines: usize) -> SearchContext {
        let start = line_idx.saturating_sub(max_context_lines);
        let end = (line_idx + max_context_lines + 1).min(line_count);
        let lines = self.content_store.get_lines(file_id, start..end);

        let (block_type, block_name) = self
            .location_index
            .get_symbol_at_line(file_id, (line_idx + 1) as u32)
            .and_then(|id| self.symbol_index.get(id))
            .map(|enhanced| (Some(enhanced.symbol.kind.as_str().to_string()), Some(enhanced.symbol.name)))
            .unwrap_or((None, None));

        SearchContext {
            lines,
            start_line: (start + 1) as u32,
            end_line: end as u32,
            block_type,
            block_name,
        }
    }
}

/// Confirm a line contains the pattern, returning the 1-based column of the
/// first match plus a crude occurrence count used as the result's score.
fn match_line(line: &str, pattern: &str, case_insensitive: bool, regex: Option<&RegexAnalysis>) -> Option<(u32, usize)> {
    if let Some(analysis) = regex {
        let matches: Vec<_> = analysis.regex.find_iter(line).collect();
        if matches.is_empty() {
            return None;
        }
        return Some(((matches[0].start() + 1) as u32, matches.len()));
    }

    if case_insensitive {
        let haystack = line.to_lowercase();
        let needle = pattern.to_lowercase();
        let column = haystack.find(&needle)? + 1;
        let occurrences = haystack.matches(&needle).count();
        Some((column as u32, occurrences))
    } else {
        let column = line.find(pattern)? + 1;
        let occurrences = line.matches(pattern).count();
        Some((column as u32, occurrences))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::snapshot::SnapshotHandle;
    use crate::model::{Span, Symbol};

    fn harness(content: &str) -> (ContentStore, LocationIndex, SymbolIndex, SnapshotHandle, FileId) {
        let file_id = FileId(1);
        let content_store = ContentStore::with_budget(1024 * 1024);
        content_store.insert(file_id, content.as_bytes().to_vec());

        let symbol = Symbol {
            file_id,
            ordinal: 0,
            kind: SymbolKind::Function,
            name: "target".to_string(),
            span: Span { start_line: 1, start_column: 1, end_line: 3, end_column: 1 },
            container_scope: None,
        };
        let location_index = LocationIndex::new();
        location_index.index_file(file_id, &[symbol.clone()]);

        let symbol_index = SymbolIndex::new();
        symbol_index.index_symbols(file_id, vec![symbol]);

        let snapshot = SnapshotHandle::new();
        snapshot.publish(|b| b.insert_file(PathBuf::from("/a.rs"), file_id, Vec::new()));

        (content_store, location_index, symbol_index, snapshot, file_id)
    }

    #[test]
    fn literal_search_finds_match_with_enclosing_symbol() {
        let (content_store, location_index, symbol_index, snapshot, file_id) = harness("fn target() {\n    needle_here();\n}\n");
        let snap = snapshot.load();
        let executor = SearchExecutor {
            content_store: &content_store,
            location_index: &location_index,
            symbol_index: &symbol_index,
            snapshot: &snap,
        };

        let mut candidates = FxHashSet::default();
        candidates.insert(file_id);
        let results = executor.search("needle_here", &candidates, &SearchOptions::default()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].line, 2);
        assert_eq!(results[0].context.block_name.as_deref(), Some("target"));
    }

    #[test]
    fn case_insensitive_search_matches_either_case() {
        let (content_store, location_index, symbol_index, snapshot, file_id) = harness("fn target() {\n    NEEDLE();\n}\n");
        let snap = snapshot.load();
        let executor = SearchExecutor {
            content_store: &content_store,
            location_index: &location_index,
            symbol_index: &symbol_index,
            snapshot: &snap,
        };

        let mut candidates = FxHashSet::default();
        candidates.insert(file_id);
        let options = SearchOptions { case_insensitive: true, ..SearchOptions::default() };
        let results = executor.search("needle", &candidates, &options).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn regex_search_confirms_each_candidate_line() {
        let (content_store, location_index, symbol_index, snapshot, file_id) = harness("fn target() {\n    process_data_42();\n}\n");
        let snap = snapshot.load();
        let executor = SearchExecutor {
            content_store: &content_store,
            location_index: &location_index,
            symbol_index: &symbol_index,
            snapshot: &snap,
        };

        let mut candidates = FxHashSet::default();
        candidates.insert(file_id);
        let options = SearchOptions { use_regex: true, ..SearchOptions::default() };
        let results = executor.search(r"process_data_\d+", &candidates, &options).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].line, 2);
    }
}
