//! OpenAI-compatible chat completions client.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use sfn_tools::ToolCall;
use tokio::time::timeout;
use tracing::debug;

use crate::http_client::{HyperClient, https_client};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, CompletionClient, CompletionRequest,
    CompletionResponse, PromptMessage,
};

/// Environment variable used when loading the API key automatically.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default endpoint base.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/";

/// Configuration for the OpenAI-compatible client.
#[derive(Clone)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
            default_temperature: None,
        }
    }

    /// Loads the API key from the `OPENAI_API_KEY` environment variable.
    #[must_use]
    pub fn from_env(model: impl Into<String>) -> Self {
        let mut cfg = Self::new(model);
        cfg.api_key = env::var(OPENAI_API_KEY_ENV).ok();
        cfg
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the default sampling temperature used when requests omit it.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Client for `/v1/chat/completions` endpoints speaking the OpenAI dialect.
///
/// The API key is optional so local compatible servers can be used.
pub struct OpenAiClient {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: Option<String>,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Constructs a new client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the endpoint is invalid.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let metadata = AdapterMetadata::new("openai", config.model.clone());
        let endpoint = format!("{}v1/chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| AdapterError::configuration(format!("invalid OpenAI endpoint: {err}")))?;

        Ok(Self {
            client: https_client(),
            endpoint,
            metadata,
            api_key: config.api_key,
            timeout: config.timeout,
            default_temperature: config.default_temperature,
        })
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: request.model().unwrap_or_else(|| self.metadata.model()),
            messages: request.messages(),
            tools: request.tools(),
            temperature: request.temperature().or(self.default_temperature),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn complete(&self, request: &CompletionRequest) -> AdapterResult<CompletionResponse> {
        let payload = self.build_request(request);
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode OpenAI request: {err}"))
        })?;

        let mut builder = Request::post(self.endpoint.clone()).header(CONTENT_TYPE, "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {api_key}"));
        }

        let http_request = builder.body(Body::from(body)).map_err(|err| {
            AdapterError::transport(format!("failed to build OpenAI request: {err}"))
        })?;

        debug!(endpoint = %self.endpoint, tools = request.tools().len(), "sending completion request");
        let response = timeout(self.timeout, self.client.request(http_request))
            .await
            .map_err(|_| AdapterError::transport("OpenAI request timed out"))?
            .map_err(|err| AdapterError::transport(format!("OpenAI request failed: {err}")))?;

        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            AdapterError::transport(format!("failed to read OpenAI response: {err}"))
        })?;

        if !status.is_success() {
            let reason = String::from_utf8_lossy(&bytes);
            return Err(AdapterError::response(format!(
                "OpenAI returned {status}: {reason}"
            )));
        }

        parse_response(&bytes)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolCall],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_tools(tools: &&[ToolCall]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

fn parse_response(bytes: &[u8]) -> AdapterResult<CompletionResponse> {
    let response: ChatCompletionResponse = serde_json::from_slice(bytes)
        .map_err(|err| AdapterError::response(format!("failed to decode OpenAI response: {err}")))?;

    let Some(message) = response
        .choices
        .into_iter()
        .find_map(|choice| choice.message)
    else {
        return Err(AdapterError::response("OpenAI response contained no choices"));
    };

    Ok(CompletionResponse::new(
        message.content,
        message.tool_calls.unwrap_or_default(),
    ))
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "OpenAI base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid OpenAI base URL: {err}")))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MessageRole;
    use sfn_tools::Function;

    fn request_with_tool() -> CompletionRequest {
        CompletionRequest::new(
            vec![
                PromptMessage::new(MessageRole::System, "system"),
                PromptMessage::new(MessageRole::User, "hello"),
            ],
            vec![ToolCall::function(Function::new("weather", "get weather"))],
        )
        .unwrap()
    }

    #[test]
    fn base_url_requires_scheme() {
        let err = OpenAiConfig::new("gpt-4o-mini")
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");

        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn sanitize_appends_trailing_slash() {
        let cfg = OpenAiConfig::new("gpt-4o-mini")
            .with_base_url("http://localhost:11434")
            .expect("valid URL");
        assert_eq!(cfg.base_url, "http://localhost:11434/");
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = OpenAiConfig::new("gpt-4o-mini").with_api_key("sk-secret");
        assert!(!format!("{cfg:?}").contains("sk-secret"));
    }

    #[tokio::test]
    async fn build_request_uses_defaults() {
        let config = OpenAiConfig::new("gpt-4o-mini").with_default_temperature(0.2);
        let client = OpenAiClient::new(config).expect("client");
        let request = request_with_tool();

        let chat = client.build_request(&request);
        assert_eq!(chat.model, "gpt-4o-mini");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.tools.len(), 1);
        assert_eq!(chat.temperature, Some(0.2));

        let value = serde_json::to_value(&chat).unwrap();
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["messages"][1]["content"], "hello");
    }

    #[test]
    fn response_parsing_extracts_tool_calls() {
        let json = br#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": { "name": "weather", "arguments": "{\"city\":\"Oslo\"}" }
                    }]
                }
            }]
        }"#;

        let response = parse_response(json).unwrap();
        assert!(response.has_tool_calls());
        let call = &response.tool_calls()[0];
        assert_eq!(call.id.as_deref(), Some("call_abc"));
        assert_eq!(call.function.arguments.as_deref(), Some("{\"city\":\"Oslo\"}"));
    }

    #[test]
    fn response_parsing_handles_plain_content() {
        let json = br#"{ "choices": [{ "message": { "content": "no func call" } }] }"#;
        let response = parse_response(json).unwrap();
        assert!(!response.has_tool_calls());
        assert_eq!(response.content(), Some("no func call"));

        let err = parse_response(br#"{ "choices": [] }"#).expect_err("no choices");
        assert!(matches!(err, AdapterError::Response { .. }));
    }
}
