//! Project root detection: walk upward from a start path looking for config
//! markers, falling back to heuristics about source-tree shape.

use std::path::{Path, PathBuf};

const LCI_MARKERS: &[&str] = &[".lci.kdl", ".lciconfig"];

const PRIMARY_MARKERS: &[&str] = &[
    ".git",
    "go.mod",
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "pom.xml",
    "build.gradle",
    "setup.py",
    "composer.json",
    "Gemfile",
];

const SECONDARY_MARKERS: &[&str] = &[
    "Makefile",
    "CMakeLists.txt",
    "Dockerfile",
    "tsconfig.json",
    "README.md",
    "README",
    "LICENSE",
    ".gitignore",
];

const STANDARD_SOURCE_DIRS: &[&str] = &["src", "lib", "source", "app", "cmd", "internal"];

/// Walk upward from `start`, returning the detected project root.
///
/// Phase one checks every ancestor (closest first) for an LCI config marker,
/// which wins outright over everything else. Phase two walks from `start`
/// upward again looking for primary then secondary markers at each level.
/// If nothing is found, falls back to counting standard source directories,
/// then to the presence of any source file, and finally to `start` itself.
pub fn detect_project_root(start: &Path) -> PathBuf {
    let start = start
        .canonicalize()
        .unwrap_or_else(|_| start.to_path_buf());

    if let Some(root) = find_marker_upward(&start, LCI_MARKERS) {
        return root;
    }
    if let Some(root) = find_marker_upward(&start, PRIMARY_MARKERS) {
        return root;
    }
    if let Some(root) = find_marker_upward(&start, SECONDARY_MARKERS) {
        return root;
    }
    if let Some(root) = find_by_source_dir_count(&start) {
        return root;
    }
    if let Some(root) = find_by_any_source_file(&start) {
        return root;
    }
    start
}

fn find_marker_upward(start: &Path, markers: &[&str]) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if markers.iter().any(|m| dir.join(m).exists()) {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

fn find_by_source_dir_count(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let count = STANDARD_SOURCE_DIRS
            .iter()
            .filter(|d| dir.join(d).is_dir())
            .count();
        if count >= 2 {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

fn find_by_any_source_file(start: &Path) -> Option<PathBuf> {
    const SOURCE_EXTS: &[&str] = &["rs", "go", "py", "js", "ts", "java", "c", "cpp", "rb"];
    let entries = std::fs::read_dir(start).ok()?;
    for entry in entries.flatten() {
        if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
            if SOURCE_EXTS.contains(&ext) {
                return Some(start.to_path_buf());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finds_cargo_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Cargo.toml"), "[package]").unwrap();
        let nested = tmp.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let root = detect_project_root(&nested);
        assert_eq!(root, tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_lci_marker_wins_over_git() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(".git")).unwrap();
        let nested = tmp.path().join("sub");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join(".lciconfig"), "").unwrap();

        let root = detect_project_root(&nested);
        assert_eq!(root, nested.canonicalize().unwrap());
    }

    #[test]
    fn test_falls_back_to_source_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("main.py"), "print('hi')").unwrap();

        let root = detect_project_root(tmp.path());
        assert_eq!(root, tmp.path().canonicalize().unwrap());
    }
}
