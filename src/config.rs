//! Configuration management for codeloom.
//!
//! Supports loading configuration from TOML files, following the layout the
//! CLI's `--init-config` subcommand writes via [`Config::write_template`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration: one section per ambient concern (project
/// location, scan limits, worker/memory tuning, search defaults, feature
/// gates).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default = "default_exclude_patterns")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub feature_flags: FeatureFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Root directory to index. Detected via [`crate::project_root`] when
    /// absent rather than defaulted to a fixed path.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { root: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default)]
    pub max_total_size_mb: Option<u64>,

    #[serde(default)]
    pub max_file_count: Option<u64>,

    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    #[serde(default)]
    pub watch_mode: bool,

    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_total_size_mb: None,
            max_file_count: None,
            respect_gitignore: true,
            watch_mode: false,
            watch_debounce_ms: default_watch_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_parallel_file_workers")]
    pub parallel_file_workers: usize,

    #[serde(default)]
    pub max_memory_mb: Option<u64>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_file_workers: default_parallel_file_workers(),
            max_memory_mb: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_max_context_lines")]
    pub max_context_lines: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_context_lines: default_max_context_lines(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub enable_memory_limits: bool,

    #[serde(default = "default_true")]
    pub enable_graceful_degradation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_memory_limits: true,
            enable_graceful_degradation: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/.git/**".to_string(),
        "**/build/**".to_string(),
        "**/dist/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/venv/**".to_string(),
        "**/.venv/**".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_watch_debounce_ms() -> u64 {
    50
}

fn default_parallel_file_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get().saturating_sub(1).max(1)).unwrap_or(1)
}

fn default_max_results() -> usize {
    100
}

fn default_max_context_lines() -> usize {
    2
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Search order: `CODELOOM_CONFIG` env var, `./codeloom.toml`, then
    /// `dirs::config_dir()/codeloom/config.toml`.
    pub fn from_default_locations() -> Result<Option<(Self, PathBuf)>> {
        if let Ok(env_path) = std::env::var("CODELOOM_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                let config = Self::from_file(&path)?;
                return Ok(Some((config, path)));
            }
        }

        let local_path = PathBuf::from("codeloom.toml");
        if local_path.exists() {
            let config = Self::from_file(&local_path)?;
            return Ok(Some((config, local_path)));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("codeloom").join("config.toml");
            if user_path.exists() {
                let config = Self::from_file(&user_path)?;
                return Ok(Some((config, user_path)));
            }
        }

        Ok(None)
    }

    pub fn generate_template() -> String {
        r#"# codeloom configuration
# Generated template - customize as needed

[project]
# root = "/path/to/project"   # detected automatically when omitted

[index]
max_file_size = 10485760       # bytes
# max_total_size_mb = 2048
# max_file_count = 200000
respect_gitignore = true
watch_mode = false
watch_debounce_ms = 50

include = []
exclude = [
    "**/node_modules/**",
    "**/target/**",
    "**/.git/**",
    "**/build/**",
    "**/dist/**",
    "**/__pycache__/**",
    "**/venv/**",
    "**/.venv/**",
]

[performance]
# parallel_file_workers = 7    # defaults to cores - 1
# max_memory_mb = 4096

[search]
max_results = 100
max_context_lines = 2

[feature_flags]
enable_memory_limits = true
enable_graceful_degradation = true
"#
        .to_string()
    }

    pub fn write_template(path: &Path) -> Result<()> {
        let template = Self::generate_template();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }
        std::fs::write(path, template)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Resolve the project root: explicit config value wins, otherwise
    /// detect it from `start`.
    pub fn resolve_root(&self, start: &Path) -> PathBuf {
        self.project
            .root
            .clone()
            .unwrap_or_else(|| crate::project_root::detect_project_root(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.index.watch_debounce_ms, 50);
        assert_eq!(config.index.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.search.max_results, 100);
        assert!(!config.exclude.is_empty());
    }

    #[test]
    fn parses_minimal_toml() {
        let toml = r#"
[project]
root = "/code/project"

[search]
max_results = 50
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.project.root, Some(PathBuf::from("/code/project")));
        assert_eq!(config.search.max_results, 50);
        // Untouched sections still pick up defaults.
        assert_eq!(config.index.watch_debounce_ms, 50);
    }

    #[test]
    fn generate_template_contains_every_section() {
        let template = Config::generate_template();
        for section in ["[project]", "[index]", "[performance]", "[search]", "[feature_flags]"] {
            assert!(template.contains(section), "missing {section}");
        }
    }
}
