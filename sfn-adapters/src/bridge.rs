//! Sends an application's tools to a completion client and returns the
//! functions the model selected.

use std::sync::Arc;

use sfn_primitives::AppId;
use sfn_tools::ToolCall;
use tracing::{info, warn};

use crate::request::RequestBuilder;
use crate::traits::{AdapterResult, CompletionClient};

/// Couples a [`RequestBuilder`] with a [`CompletionClient`].
pub struct LlmBridge {
    builder: RequestBuilder,
    client: Arc<dyn CompletionClient>,
}

impl std::fmt::Debug for LlmBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmBridge")
            .field("builder", &self.builder)
            .field("client", self.client.metadata())
            .finish()
    }
}

impl LlmBridge {
    /// Creates a bridge.
    #[must_use]
    pub fn new(builder: RequestBuilder, client: Arc<dyn CompletionClient>) -> Self {
        Self { builder, client }
    }

    /// Returns the request builder.
    #[must_use]
    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    /// Asks the model which of `app_id`'s functions fit `message`.
    ///
    /// An empty result means the model chose none.
    ///
    /// # Errors
    ///
    /// Propagates request building and client failures.
    pub async fn invoke(
        &self,
        app_id: &AppId,
        message: impl Into<String>,
    ) -> AdapterResult<Vec<ToolCall>> {
        let request = self.builder.build(app_id, message)?;
        let metadata = self.client.metadata();
        info!(
            app_id = %app_id,
            provider = metadata.provider(),
            model = metadata.model(),
            tools = request.tools().len(),
            "invoke LLM function"
        );

        let response = self.client.complete(&request).await?;
        if !response.has_tool_calls() {
            warn!(app_id = %app_id, content = response.content().unwrap_or_default(), "no func call");
            return Ok(Vec::new());
        }

        for call in response.tool_calls() {
            info!(
                app_id = %app_id,
                id = call.id.as_deref().unwrap_or_default(),
                name = %call.function.name,
                arguments = call.function.arguments.as_deref().unwrap_or("{}"),
                "LLM selected function"
            );
        }
        Ok(response.into_tool_calls())
    }
}
