//! The "opaque parser" collaborator named in the design: something that
//! turns a buffer into symbols, references, scopes, and side-effect
//! summaries. Language parsing itself is out of scope for the core (per the
//! design's stated boundary); this module only defines the seam and a
//! tree-sitter-backed implementation of it, so the ingest pipeline has
//! something real to drive end to end.

mod treesitter;

pub use treesitter::TreeSitterParser;

use crate::model::ParsedFile;

/// Anything that can turn file content into the structured facts the
/// integrator feeds to the sub-indexes. Kept as a trait (rather than a
/// concrete type threaded through the pipeline) so a different frontend -
/// a language server, a non-tree-sitter grammar - can stand in without
/// touching scanner/processor/integrator code.
pub trait Parser: Send {
    /// Parse `content` from a file with the given extension (without the
    /// leading dot). Returns an empty `ParsedFile` for unrecognized
    /// extensions rather than an error - an unparseable file is still
    /// indexable for trigram search.
    fn parse(&mut self, extension: &str, content: &str) -> ParsedFile;
}

/// Build a fresh parser instance. Each processor worker owns one privately
/// so tree-sitter's internal parser state is never shared across threads.
pub fn new_parser() -> Box<dyn Parser> {
    Box::new(TreeSitterParser::new())
}
