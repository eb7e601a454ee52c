//! Stderr logging through `tracing_subscriber`, filtered by `BIFURC_LOG`.
//!
//! The core logs with the `log` macros; the subscriber's `tracing-log`
//! bridge forwards those records.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "BIFURC_LOG";
pub const DEFAULT_LEVEL: &str = "warn";

/// Builds the filter from an `EnvFilter` directive string such as `debug`
/// or `bifurc_core=trace`. Blank or missing values use [`DEFAULT_LEVEL`].
pub fn env_filter(value: Option<&str>) -> Result<EnvFilter> {
    let directives = match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => DEFAULT_LEVEL,
    };
    EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid {} value \"{}\"", LOG_ENV, directives))
}

/// Installs the global subscriber. Fails on a bad `BIFURC_LOG` or when a
/// subscriber is already set.
pub fn init() -> Result<()> {
    let filter = env_filter(std::env::var(LOG_ENV).ok().as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {}", e))
}
