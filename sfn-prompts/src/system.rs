//! System instructions prepended to completion requests.

use serde::{Deserialize, Serialize};

use crate::error::{PromptError, PromptResult};

/// Instruction asking the model to pick the best tool or decline.
pub const TOOL_SELECTION_INSTRUCTION: &str = "You are a very helpful assistant. Your job is to choose the best possible action to solve the user question or task. If you don't know the answer, stop the conversation by saying \"no func call\".";

/// Represents a system instruction applied to all downstream prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInstruction {
    content: String,
}

impl Default for SystemInstruction {
    fn default() -> Self {
        Self::tool_selection()
    }
}

/// Builder for [`SystemInstruction`].
#[derive(Debug, Default)]
pub struct SystemInstructionBuilder {
    content: String,
}

impl SystemInstructionBuilder {
    /// Creates a new builder instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instruction content.
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Builds the instruction.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::EmptyInstruction`] when no content was set.
    pub fn build(self) -> PromptResult<SystemInstruction> {
        if self.content.trim().is_empty() {
            return Err(PromptError::EmptyInstruction);
        }

        Ok(SystemInstruction {
            content: self.content,
        })
    }
}

impl SystemInstruction {
    /// Returns a builder instance.
    #[must_use]
    pub fn builder() -> SystemInstructionBuilder {
        SystemInstructionBuilder::new()
    }

    /// The default tool-selection instruction.
    #[must_use]
    pub fn tool_selection() -> Self {
        Self {
            content: TOOL_SELECTION_INSTRUCTION.to_owned(),
        }
    }

    /// Returns the textual content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_asks_for_tool_choice() {
        let instruction = SystemInstruction::default();
        assert!(instruction.content().contains("choose the best possible action"));
        assert!(instruction.content().ends_with("\"no func call\"."));
    }

    #[test]
    fn builder_rejects_blank_content() {
        let err = SystemInstruction::builder().content("  ").build().unwrap_err();
        assert_eq!(err, PromptError::EmptyInstruction);

        let custom = SystemInstruction::builder()
            .content("Pick a weather tool.")
            .build()
            .unwrap();
        assert_eq!(custom.content(), "Pick a weather tool.");
    }
}
