//! Stream functions exposed to LLMs as schema-described tools.
//!
//! This facade bundles the runtime crates behind feature flags so downstream
//! users can enable only what they need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use sfn_primitives as primitives;

/// Stream function runtime (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use sfn_kernel as kernel;

/// Completion request building and LLM clients (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use sfn_adapters as adapters;

/// Tool types, schema reflection and the registry (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use sfn_tools as tools;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use sfn_telemetry as telemetry;

/// System instructions (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use sfn_prompts as prompts;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use sfn_config as config;
