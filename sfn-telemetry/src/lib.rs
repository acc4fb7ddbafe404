//! Observability setup for stream functions.

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or empty.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Output options for [`init_tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOptions {
    /// Include the event target (module path) in each line.
    pub with_target: bool,
    /// Emit ANSI colour codes.
    pub ansi: bool,
}

/// Builds the filter from `RUST_LOG`, falling back to `default_directive`.
///
/// # Errors
///
/// Returns an error when `RUST_LOG` is set but cannot be parsed.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(&value)
            .map_err(|err| anyhow!("invalid {} `{value}`: {err}", EnvFilter::DEFAULT_ENV)),
        _ => EnvFilter::try_new(default_directive)
            .map_err(|err| anyhow!("invalid default directive `{default_directive}`: {err}")),
    }
}

/// Installs the global fmt subscriber.
///
/// # Errors
///
/// Returns an error when the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(options: TracingOptions) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_DIRECTIVE)?)
        .with_target(options.with_target)
        .with_ansi(options.ansi)
        .with_level(true)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
