//! codeloom CLI: a thin consumer of `Coordinator`'s Ingest and Query APIs.
//!
//! Every subcommand calls straight through to the public `Coordinator`
//! surface and contains no indexing logic of its own. Output is either
//! human-readable text or, with `--json`, a `serde_json`-serialized value.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codeloom::config::Config;
use codeloom::coordinator::{Coordinator, SearchWithOptions};
use codeloom::model::SymbolKind;
use codeloom::watcher::{FileChange, FileWatcher, WatcherConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "codeloom")]
#[command(author, version, about = "In-memory, symbol-aware code index", long_about = None)]
struct Cli {
    /// Path to a codeloom.toml config file; falls back to the default search order.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit serde_json instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write a config template to the given path and exit.
    #[arg(long)]
    init_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every admitted file under `path`.
    Index { path: PathBuf },

    /// Search the current index.
    Search {
        pattern: String,
        #[arg(long, default_value = "0")]
        max_results: i64,
        #[arg(long)]
        case_insensitive: bool,
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        declarations_only: bool,
        #[arg(long)]
        usages_only: bool,
        #[arg(long = "symbol-type")]
        symbol_types: Vec<String>,
        #[arg(long)]
        include: Option<String>,
    },

    /// Re-index a single file from disk.
    Update { path: PathBuf },

    /// Remove a single file from the index.
    Remove { path: PathBuf },

    /// Watch a directory and keep the index current as files change.
    Watch { path: PathBuf },

    /// Print the coordinator's health report.
    Health,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    codeloom::telemetry::init_telemetry(log_level).ok();

    if let Some(path) = &cli.init_config {
        Config::write_template(path).with_context(|| format!("failed to write config template to {}", path.display()))?;
        println!("wrote config template to {}", path.display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_default_locations()?.map(|(config, _path)| config).unwrap_or_default(),
    };

    let Some(command) = cli.command else {
        eprintln!("no subcommand given; try `codeloom --help`");
        std::process::exit(2);
    };

    let coordinator = Arc::new(Coordinator::new(config));

    match command {
        Command::Index { path } => run_index(&coordinator, &path, cli.json),
        Command::Search { pattern, max_results, case_insensitive, regex, declarations_only, usages_only, symbol_types, include } => run_search(
            &coordinator,
            &pattern,
            max_results,
            case_insensitive,
            regex,
            declarations_only,
            usages_only,
            symbol_types,
            include,
            cli.json,
        ),
        Command::Update { path } => run_update(&coordinator, &path, cli.json),
        Command::Remove { path } => run_remove(&coordinator, &path, cli.json),
        Command::Watch { path } => run_watch(&coordinator, &path),
        Command::Health => run_health(&coordinator, cli.json),
    }
}

fn run_index(coordinator: &Coordinator, path: &PathBuf, json: bool) -> Result<()> {
    info!(root = %path.display(), "indexing directory");
    let outcome = coordinator.index_directory(path).map_err(anyhow::Error::from)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "files_indexed": outcome.files_indexed,
                "files_skipped_size": outcome.files_skipped_size,
                "files_skipped_binary": outcome.files_skipped_binary,
                "errors": outcome.errors,
            }))?
        );
    } else {
        println!(
            "indexed {} files ({} skipped for size, {} skipped as binary, {} errors)",
            outcome.files_indexed,
            outcome.files_skipped_size,
            outcome.files_skipped_binary,
            outcome.errors.len()
        );
        for error in &outcome.errors {
            println!("  ! {}: {}", error.path.display(), error.message);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_search(
    coordinator: &Coordinator,
    pattern: &str,
    max_results: i64,
    case_insensitive: bool,
    use_regex: bool,
    declaration_only: bool,
    usage_only: bool,
    symbol_types: Vec<String>,
    include_pattern: Option<String>,
    json: bool,
) -> Result<()> {
    let symbol_types = symbol_types.iter().filter_map(|s| parse_symbol_kind(s)).collect();
    let options = SearchWithOptions {
        case_insensitive,
        use_regex,
        max_results,
        declaration_only,
        usage_only,
        symbol_types,
        include_pattern,
        ..SearchWithOptions::default()
    };
    let results = coordinator.search_with_options(pattern, options).map_err(anyhow::Error::from)?;

    if json {
        let serializable: Vec<_> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path,
                    "line": r.line,
                    "column": r.column,
                    "score": r.score,
                    "block_type": r.context.block_type,
                    "block_name": r.context.block_name,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&serializable)?);
    } else if results.is_empty() {
        println!("no matches");
    } else {
        for r in &results {
            println!("{}:{}:{}", r.path.display(), r.line, r.column);
            for line in &r.context.lines {
                println!("    {line}");
            }
        }
        println!("{} match(es)", results.len());
    }
    Ok(())
}

fn parse_symbol_kind(s: &str) -> Option<SymbolKind> {
    match s.to_lowercase().as_str() {
        "function" => Some(SymbolKind::Function),
        "method" => Some(SymbolKind::Method),
        "struct" => Some(SymbolKind::Struct),
        "interface" => Some(SymbolKind::Interface),
        "variable" => Some(SymbolKind::Variable),
        "constant" => Some(SymbolKind::Constant),
        "type" => Some(SymbolKind::Type),
        "class" => Some(SymbolKind::Class),
        "enum" => Some(SymbolKind::Enum),
        "trait" => Some(SymbolKind::Trait),
        "module" => Some(SymbolKind::Module),
        _ => None,
    }
}

fn run_update(coordinator: &Coordinator, path: &PathBuf, json: bool) -> Result<()> {
    let content = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_id = coordinator.update_file(path, &content).map_err(anyhow::Error::from)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "file_id": file_id.as_u32() }))?);
    } else {
        println!("updated {} (file_id={})", path.display(), file_id);
    }
    Ok(())
}

fn run_remove(coordinator: &Coordinator, path: &PathBuf, json: bool) -> Result<()> {
    coordinator.remove_file(path).map_err(anyhow::Error::from)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "removed": path }))?);
    } else {
        println!("removed {}", path.display());
    }
    Ok(())
}

fn run_watch(coordinator: &Arc<Coordinator>, path: &PathBuf) -> Result<()> {
    coordinator.index_directory(path).map_err(anyhow::Error::from)?;
    println!("indexed {} files, watching {} for changes", coordinator.file_count(), path.display());

    let watcher_config = WatcherConfig {
        paths: vec![path.clone()],
        debounce_duration: std::time::Duration::from_millis(coordinator.config().index.watch_debounce_ms.max(1) * 4),
        exclude_patterns: coordinator.config().exclude.clone(),
    };
    let watcher = FileWatcher::new(watcher_config)?;

    loop {
        match watcher.recv() {
            Some(FileChange::Modified(changed)) => match coordinator.index_file(&changed) {
                Ok(_) => info!(path = %changed.display(), "reindexed"),
                Err(err) => info!(path = %changed.display(), error = %err, "reindex failed"),
            },
            Some(FileChange::Deleted(changed)) => {
                if let Err(err) = coordinator.remove_file(&changed) {
                    info!(path = %changed.display(), error = %err, "remove failed");
                } else {
                    info!(path = %changed.display(), "removed");
                }
            }
            Some(FileChange::Renamed { from, to }) => {
                let _ = coordinator.remove_file(&from);
                if let Err(err) = coordinator.index_file(&to) {
                    info!(path = %to.display(), error = %err, "reindex after rename failed");
                }
            }
            None => break,
        }
    }
    Ok(())
}

fn run_health(coordinator: &Coordinator, json: bool) -> Result<()> {
    let report = coordinator.health_check();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("status: {:?}", report.status);
        println!(
            "files: {}, symbols: {}, references: {}, content bytes: {}, indexing: {}",
            report.metrics.file_count, report.metrics.symbol_count, report.metrics.reference_count, report.metrics.content_bytes, report.metrics.is_indexing
        );
        for error in &report.errors {
            println!("  error: {error}");
        }
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
    }
    Ok(())
}
