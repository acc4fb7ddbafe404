//! Prompt building blocks shared by completion requests.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod system;

pub use error::{PromptError, PromptResult};
pub use system::{SystemInstruction, SystemInstructionBuilder, TOOL_SELECTION_INSTRUCTION};
