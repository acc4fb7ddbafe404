//! LLM tool descriptions derived from application models.
//!
//! Models describe their own shape through `schemars::JsonSchema`; the
//! [`schema`] module turns that shape into function parameters and the
//! [`registry`] module keeps the resulting tools per application.

#![warn(missing_docs, clippy::pedantic)]

pub mod registry;
pub mod schema;
pub mod types;

pub use registry::{FunctionCaller, RegistryError, RegistryResult, ToolRegistry};
pub use schema::{ModelDescriptor, SchemaError, SchemaResult, derive_schema};
pub use types::{FUNCTION_TOOL_TYPE, Function, FunctionParameters, ParameterProperty, ToolCall};
