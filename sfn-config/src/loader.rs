//! Configuration loaders.

use std::path::Path;

use anyhow::{Context, Result};
use sfn_primitives::AppId;
use tracing::debug;

use crate::schema::Config;

/// Prefix shared by every environment variable the loader reads.
pub const ENV_PREFIX: &str = "SFN_";

impl Config {
    /// Parses and validates a JSON document. Missing fields keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or fails
    /// validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        debug!(path = %path.display(), "loading configuration file");
        Self::from_json_str(&json).with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Builds a configuration from defaults overridden by `SFN_*` environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable holds an unparsable value or the
    /// result fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable holds an unparsable value or the
    /// result fails validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields for which `lookup` returns a value. Does not validate.
    ///
    /// Recognised keys: `SFN_NAME`, `SFN_APP_ID`, `SFN_ZIPPER_ADDR`,
    /// `SFN_DESCRIPTION`, `SFN_LLM_MODEL`, `SFN_LLM_BASE_URL`,
    /// `SFN_LLM_API_KEY_ENV`, `SFN_LLM_TIMEOUT_SECS`, `SFN_LLM_TEMPERATURE`.
    ///
    /// # Errors
    ///
    /// Returns an error when a value cannot be parsed into its field type.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            let key = format!("{ENV_PREFIX}{suffix}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = get("NAME") {
            self.sfn.name = value;
        }
        if let Some((key, value)) = get("APP_ID") {
            self.sfn.app_id = AppId::new(value).with_context(|| format!("invalid {key}"))?;
        }
        if let Some((_, value)) = get("ZIPPER_ADDR") {
            self.sfn.zipper_addr = value;
        }
        if let Some((_, value)) = get("DESCRIPTION") {
            self.sfn.description = value;
        }
        if let Some((_, value)) = get("LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some((_, value)) = get("LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some((_, value)) = get("LLM_API_KEY_ENV") {
            self.llm.api_key_env = value;
        }
        if let Some((key, value)) = get("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = value
                .parse()
                .with_context(|| format!("invalid {key} `{value}`"))?;
        }
        if let Some((key, value)) = get("LLM_TEMPERATURE") {
            self.llm.temperature = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid {key} `{value}`"))?,
            );
        }
        Ok(())
    }
}
