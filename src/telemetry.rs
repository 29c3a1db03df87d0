//! Tracing initialization for codeloom's binary entry points.
//!
//! Library code never installs a subscriber itself - only `main` does, via
//! [`init_telemetry`] - so the core crate stays embeddable in a caller that
//! already owns its own subscriber. No distributed exporter is wired up:
//! this crate runs as a single process, and span export to a remote
//! collector would only exist to support operation this crate explicitly
//! does not do.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a `tracing_subscriber::fmt` layer with an `EnvFilter` that
/// respects `RUST_LOG`, falling back to `default_level` when unset.
pub fn init_telemetry(default_level: Level) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}
