//! Prompt error types.

use thiserror::Error;

/// Result alias for prompt operations.
pub type PromptResult<T> = Result<T, PromptError>;

/// Errors raised while building prompts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    /// Instruction content was empty or whitespace.
    #[error("system instruction cannot be empty")]
    EmptyInstruction,
}
