//! Structured logging for the CLI.
//!
//! Logs go to stderr so stdout stays parseable. The filter comes from
//! `RLENS_LOG`, else `RUST_LOG`, else `warn`.

use anyhow::{anyhow, Result};
use std::env;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RLENS_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init_logging() -> Result<()> {
    let filter = build_filter()?;
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
    if let Err(e) = result {
        // A subscriber is already installed (tests, embedding).
        tracing::debug!(error = %e, "Logging already initialized");
    }
    Ok(())
}

fn build_filter() -> Result<EnvFilter> {
    if let Ok(spec) = env::var(LOG_ENV) {
        if !spec.trim().is_empty() {
            return EnvFilter::try_new(&spec)
                .map_err(|e| anyhow!("invalid {} filter '{}': {}", LOG_ENV, spec, e));
        }
    }

    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}
