//! Query-prefix parsing: pulls `path:GLOB`, `dir:PATH`, and `ext:.EXT`
//! tokens out of a raw search pattern, leaving the remaining whitespace-
//! separated tokens as the content pattern the executor actually scans for.

/// The decomposed form of a raw `SearchWithOptions` pattern string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub content_pattern: String,
    pub path_glob: Option<String>,
    pub dir_prefix: Option<String>,
    pub ext: Option<String>,
}

/// Split `raw` into its prefix filters and content tokens. Prefixes are
/// matched by a case-sensitive `path:`/`dir:`/`ext:` literal; everything
/// else is joined back with single spaces to form the content pattern.
pub fn parse_query(raw: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let mut content_tokens = Vec::new();

    for token in raw.split_whitespace() {
        if let Some(rest) = token.strip_prefix("path:") {
            parsed.path_glob = Some(rest.to_string());
        } else if let Some(rest) = token.strip_prefix("dir:") {
            parsed.dir_prefix = Some(rest.to_string());
        } else if let Some(rest) = token.strip_prefix("ext:") {
            let normalized = if rest.starts_with('.') { rest.to_string() } else { format!(".{rest}") };
            parsed.ext = Some(normalized);
        } else {
            content_tokens.push(token);
        }
    }

    parsed.content_pattern = content_tokens.join(" ");
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pattern_has_no_prefixes() {
        let parsed = parse_query("Foo");
        assert_eq!(parsed.content_pattern, "Foo");
        assert!(parsed.path_glob.is_none());
    }

    #[test]
    fn path_prefix_is_extracted() {
        let parsed = parse_query("path:**/*.go Foo");
        assert_eq!(parsed.content_pattern, "Foo");
        assert_eq!(parsed.path_glob.as_deref(), Some("**/*.go"));
    }

    #[test]
    fn ext_prefix_normalizes_leading_dot() {
        let parsed = parse_query("ext:md Bar");
        assert_eq!(parsed.ext.as_deref(), Some(".md"));
        let parsed = parse_query("ext:.md Bar");
        assert_eq!(parsed.ext.as_deref(), Some(".md"));
    }

    #[test]
    fn dir_prefix_is_extracted() {
        let parsed = parse_query("dir:src/core Foo Bar");
        assert_eq!(parsed.dir_prefix.as_deref(), Some("src/core"));
        assert_eq!(parsed.content_pattern, "Foo Bar");
    }

    #[test]
    fn multiple_prefixes_combine() {
        let parsed = parse_query("path:**/*.rs dir:src ext:rs needle");
        assert_eq!(parsed.content_pattern, "needle");
        assert!(parsed.path_glob.is_some());
        assert!(parsed.dir_prefix.is_some());
        assert!(parsed.ext.is_some());
    }
}
