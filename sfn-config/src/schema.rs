//! Strongly typed configuration schemas.

use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};
use sfn_primitives::AppId;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Stream function settings.
    pub sfn: StreamFunctionConfig,
    /// LLM client settings.
    pub llm: LlmConfig,
}

impl Config {
    /// Checks that every section holds usable values.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.sfn.validate()?;
        self.llm.validate()
    }
}

/// Settings for a single stream function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamFunctionConfig {
    /// Function name, also used as the LLM tool name.
    pub name: String,
    /// Application the function's tools are registered under.
    pub app_id: AppId,
    /// Broker address as `host:port`.
    pub zipper_addr: String,
    /// Description advertised to the model.
    pub description: String,
}

impl Default for StreamFunctionConfig {
    fn default() -> Self {
        Self {
            name: "sfn".to_owned(),
            app_id: AppId::default(),
            zipper_addr: "localhost:9000".to_owned(),
            description: String::new(),
        }
    }
}

impl StreamFunctionConfig {
    fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "sfn.name must not be empty");
        let Some((host, port)) = self.zipper_addr.rsplit_once(':') else {
            bail!("sfn.zipper_addr `{}` must be host:port", self.zipper_addr);
        };
        ensure!(!host.is_empty(), "sfn.zipper_addr `{}` has no host", self.zipper_addr);
        ensure!(
            port.parse::<u16>().is_ok(),
            "sfn.zipper_addr `{}` has an invalid port",
            self.zipper_addr
        );
        Ok(())
    }
}

/// Settings for the OpenAI-compatible completions client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Model identifier sent with each request.
    pub model: String,
    /// Endpoint base, e.g. `https://api.openai.com/`.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_owned(),
            base_url: "https://api.openai.com/".to_owned(),
            api_key_env: "OPENAI_API_KEY".to_owned(),
            timeout_secs: 60,
            temperature: None,
        }
    }
}

impl LlmConfig {
    fn validate(&self) -> Result<()> {
        ensure!(!self.model.trim().is_empty(), "llm.model must not be empty");
        ensure!(
            self.base_url.starts_with("http://") || self.base_url.starts_with("https://"),
            "llm.base_url `{}` must start with http:// or https://",
            self.base_url
        );
        ensure!(self.timeout_secs > 0, "llm.timeout_secs must be positive");
        if let Some(temperature) = self.temperature {
            ensure!(
                (0.0..=2.0).contains(&temperature),
                "llm.temperature {temperature} is outside 0.0..=2.0"
            );
        }
        Ok(())
    }
}
