//! Configuration for stream functions and the LLM client they talk to.
//!
//! Values come from JSON documents or `SFN_*` environment variables and are
//! checked with [`Config::validate`] before use.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::ENV_PREFIX;
pub use schema::{Config, LlmConfig, StreamFunctionConfig};
