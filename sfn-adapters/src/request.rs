//! Builds completion requests from the tools registered for an application.

use std::sync::Arc;

use sfn_primitives::AppId;
use sfn_prompts::SystemInstruction;
use sfn_tools::ToolRegistry;
use tracing::debug;

use crate::traits::{AdapterResult, CompletionRequest, MessageRole, PromptMessage};

/// Assembles `[system, user]` messages plus the application's tool list.
///
/// The registry is only read; an application without tools produces an empty
/// `tools` array.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    registry: Arc<ToolRegistry>,
    instruction: SystemInstruction,
}

impl RequestBuilder {
    /// Creates a builder using the default tool-selection instruction.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            instruction: SystemInstruction::tool_selection(),
        }
    }

    /// Replaces the system instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: SystemInstruction) -> Self {
        self.instruction = instruction;
        self
    }

    /// Returns the registry backing this builder.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Builds the completion request for `app_id`.
    ///
    /// # Errors
    ///
    /// Propagates [`AdapterError`](crate::traits::AdapterError) from request
    /// validation.
    pub fn build(
        &self,
        app_id: &AppId,
        user_message: impl Into<String>,
    ) -> AdapterResult<CompletionRequest> {
        let tools = self.registry.tools_for(app_id);
        debug!(app_id = %app_id, tools = tools.len(), "building completion request");

        let messages = vec![
            PromptMessage::new(MessageRole::System, self.instruction.content()),
            PromptMessage::new(MessageRole::User, user_message),
        ];
        CompletionRequest::new(messages, tools)
    }

    /// Builds the request for `app_id` and serializes it to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`](crate::traits::AdapterError::InvalidRequest)
    /// when the request cannot be encoded.
    pub fn build_invocation_payload(
        &self,
        app_id: &AppId,
        user_message: impl Into<String>,
    ) -> AdapterResult<String> {
        self.build(app_id, user_message)?.to_json()
    }
}
