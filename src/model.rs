//! The data model shared by every sub-index: [`FileId`], [`Symbol`],
//! [`EnhancedSymbol`], [`Reference`], [`Scope`], and the composite key types
//! that tie a symbol or reference back to the file that produced it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque dense identifier for a (path, content) pair.
///
/// Monotonically assigned and immutable for the lifetime of that pairing:
/// any content change re-assigns the path a new `FileId` and marks the old
/// one deleted rather than mutating it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A symbol's position within its defining file, as a stable cross-index key.
///
/// Stable while the owning `FileId` is live; an edit to the file mints a new
/// `FileId` and therefore a new `CompositeSymbolId` even for an unchanged
/// symbol name, matching [`FileId`]'s own re-assignment rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeSymbolId {
    pub file_id: FileId,
    pub ordinal: u32,
}

impl CompositeSymbolId {
    pub fn new(file_id: FileId, ordinal: u32) -> Self {
        Self { file_id, ordinal }
    }
}

impl std::fmt::Display for CompositeSymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_id, self.ordinal)
    }
}

/// The kind of a definition site recorded by the symbol index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Struct,
    Interface,
    Variable,
    Constant,
    Type,
    Class,
    Enum,
    Trait,
    Module,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Type => "type",
            SymbolKind::Class => "class",
            SymbolKind::Enum => "enum",
            SymbolKind::Trait => "trait",
            SymbolKind::Module => "module",
        }
    }
}

/// A single source-position span, 1-based for both line and column to match
/// the result schema exposed at the query boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn point(line: u32, column: u32) -> Self {
        Self {
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: column,
        }
    }

    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// A definition: a named, typed, positioned entity inside a file.
///
/// `container_scope` is the ordinal of the deepest enclosing [`Scope`] in
/// that file's scope table, or `None` for file-level definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub file_id: FileId,
    pub ordinal: u32,
    pub kind: SymbolKind,
    pub name: String,
    pub span: Span,
    pub container_scope: Option<u32>,
}

impl Symbol {
    pub fn id(&self) -> CompositeSymbolId {
        CompositeSymbolId::new(self.file_id, self.ordinal)
    }
}

/// Coarse estimate of how "complex" a symbol's body is, used to rank search
/// hits and to populate `GetTopSymbols`. Derived, not authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub line_count: u32,
    pub branch_count: u32,
}

/// Whether a symbol's body was observed to touch anything beyond its own
/// locals: I/O, globals, or calls to other side-effecting symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurityCategory {
    #[default]
    Unknown,
    Pure,
    ReadsGlobalState,
    HasSideEffects,
}

/// A [`Symbol`] enriched with data only available after the whole corpus is
/// ingested: reference counts and a coarse purity signal. Rebuilt by the
/// debounced rebuilder, never computed inline during ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedSymbol {
    pub symbol: Symbol,
    pub incoming_references: u32,
    pub outgoing_references: u32,
    pub complexity: ComplexityMetrics,
    pub purity: PurityCategory,
}

impl EnhancedSymbol {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            incoming_references: 0,
            outgoing_references: 0,
            complexity: ComplexityMetrics::default(),
            purity: PurityCategory::default(),
        }
    }
}

/// What a [`Reference`] is doing to the name it mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Call,
    Import,
    /// A quoted C/C++ `#include "..."` - resolved heuristically against the
    /// corpus's known file paths rather than the symbol table, unlike
    /// `Import`.
    Include,
    TypeUse,
    Read,
    Write,
}

/// Tri-state resolution outcome for a reference, kept distinct from whether
/// the reference even has a resolution attempt recorded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved(CompositeSymbolId),
    Unresolved,
    Ambiguous,
}

/// Closed quality enum for a resolved reference — promoted from the
/// free-form string the original tracker used (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Exact,
    Heuristic,
}

/// A use of a name: a call, an import, a type mention, or a read/write of a
/// variable. Carries enough to resolve against the reference tracker's name
/// table and to report back to the caller when resolution fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub source_file: FileId,
    pub line: u32,
    pub column: u32,
    pub kind: ReferenceKind,
    pub referenced_name: String,
    pub resolution: Resolution,
    pub candidates: Vec<CompositeSymbolId>,
    pub quality: Option<Quality>,
    pub failure_reason: Option<String>,
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved(_))
    }
}

/// The kind of a lexical scope, from the coarsest (whole file) to the
/// finest (a bare `{ }` block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    File,
    Function,
    Block,
    Class,
}

/// A node in a file's scope tree. `parent` is the ordinal of the enclosing
/// scope within the same file, or `None` for the root (file) scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub file_id: FileId,
    pub ordinal: u32,
    pub kind: ScopeKind,
    pub span: Span,
    pub parent: Option<u32>,
}

/// The result of parsing one file's content: everything the integrator needs
/// to feed every sub-index for that file. Produced by the pluggable
/// `parser::Parser` collaborator, consumed by `ingest::integrator`.
///
/// The parser runs before a `FileId` has been assigned (assignment happens
/// only once the integrator admits the file), so every `file_id`/`source_file`
/// field here is a `FileId(0)` placeholder. [`Self::retag_file_id`] must be
/// called with the real assigned id before any of this reaches a sub-index -
/// otherwise every file's ordinal-0 symbol would collide on the same
/// `CompositeSymbolId`.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub scopes: Vec<Scope>,
    pub side_effects: Vec<SideEffectSummary>,
}

impl ParsedFile {
    /// Stamp the real `file_id` onto every symbol, reference, and scope
    /// produced by the parser, replacing the `FileId(0)` placeholder.
    pub fn retag_file_id(&mut self, file_id: FileId) {
        for symbol in &mut self.symbols {
            symbol.file_id = file_id;
        }
        for reference in &mut self.references {
            reference.source_file = file_id;
        }
        for scope in &mut self.scopes {
            scope.file_id = file_id;
        }
    }
}

/// A coarse per-symbol side-effect summary, staged by the integrator and
/// propagated through the call graph during the bulk reduce phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideEffectSummary {
    pub symbol_ordinal: u32,
    pub purity: PurityCategory,
}

/// A byte offset into a file's content, used by the trigram posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocation {
    pub file_id: FileId,
    pub offset: u32,
}

/// A fully-qualified filesystem path paired with the raw bytes read from it,
/// as produced by the scanner/processor and consumed by the integrator.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: PathBuf,
    pub priority: u8,
}
