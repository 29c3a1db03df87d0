//! Query-side collaborators: path filtering, regex acceleration, and the
//! search executor that turns trigram candidates into scored [`Result`]s.
//! The watcher and the sub-indexes themselves live outside this module - see
//! [`crate::watcher`] and [`crate::index`].

pub mod executor;
pub mod path_filter;
pub mod query;
pub mod regex_search;

pub use executor::{SearchExecutor, SearchOptions, SearchResult};
pub use path_filter::PathFilter;
pub use query::{parse_query, ParsedQuery};
pub use regex_search::RegexAnalysis;
