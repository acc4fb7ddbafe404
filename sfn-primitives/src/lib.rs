//! Core shared types for stream functions and the LLM tool registry.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod tag;

/// Error type and result alias shared across the SDK.
pub use error::{Error, Result};
/// Identifier partitioning the tool registry by application.
pub use ids::{AppId, DEFAULT_APP_ID};
/// Data tag routing payloads between stream functions.
pub use tag::Tag;
