// toolrelay-core/src/config.rs

//! Configuration structures and parsing for the relay.
//!
//! A [`RelayConfig`] is resolved once at startup (TOML file, flags, environment)
//! and then only ever read. Credential presence for the chosen backend is
//! checked by [`crate::transport::select_transport`], not here.

use crate::errors::RelayError;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MODEL_NAME: &str = "eu.anthropic.claude-3-5-sonnet-20240620-v1:0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where chat requests are sent.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Through an intermediary gateway, authorized with a bearer token.
    Gateway,
    /// Straight to the model provider, authorized with an API key.
    #[default]
    Direct,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Gateway => write!(f, "gateway"),
            BackendMode::Direct => write!(f, "direct"),
        }
    }
}

/// Whether the follow-up request repeats the tool schema.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolSchemaPolicy {
    #[default]
    Always,
    InitialOnly,
}

#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Gateway bearer token. Usually filled from the `TOKEN` environment variable.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Credentials {
    /// Returns the bearer token if it is set and not blank.
    pub fn bearer_token(&self) -> Option<&str> {
        non_blank(&self.bearer_token)
    }

    /// Returns the direct-mode API key (the access key id) if set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(&self.access_key_id)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// Secrets never reach the logs through `{:?}`.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(value: &Option<String>) -> &'static str {
            if value.is_some() { "<set>" } else { "<unset>" }
        }
        f.debug_struct("Credentials")
            .field("access_key_id", &mask(&self.access_key_id))
            .field("secret_access_key", &mask(&self.secret_access_key))
            .field("session_token", &mask(&self.session_token))
            .field("bearer_token", &mask(&self.bearer_token))
            .finish()
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolServiceConfig {
    pub url: String,
    /// Send the requested location as the `location` query parameter.
    #[serde(default = "default_true")]
    pub forward_location: bool,
}

fn default_true() -> bool {
    true
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    #[serde(default)]
    pub mode: BackendMode,
    /// Gateway base address, or an override of the provider address in direct mode.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub tool_service: Option<ToolServiceConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub tool_schema: ToolSchemaPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            base_url: None,
            credentials: Credentials::default(),
            model_name: default_model_name(),
            tool_service: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tool_schema: ToolSchemaPolicy::default(),
        }
    }
}

impl RelayConfig {
    pub fn from_toml_str(config_toml_content: &str) -> Result<RelayConfig> {
        let config: RelayConfig = match toml::from_str(config_toml_content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(anyhow!(e))
                    .context("Failed to parse configuration TOML content. Check TOML syntax.");
            }
        };
        config.validate()?;
        tracing::info!(mode = %config.mode, model = %config.model_name, "Parsed and validated relay configuration.");
        Ok(config)
    }

    /// Checks values that do not depend on the selected backend.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.model_name.trim().is_empty() {
            return Err(RelayError::config("'model_name' is empty."));
        }
        if self.timeout_secs == 0 {
            return Err(RelayError::config("'timeout_secs' must be greater than zero."));
        }
        if let Some(base_url) = &self.base_url {
            Url::parse(base_url).map_err(|e| {
                RelayError::config(format!("Invalid URL format for 'base_url' ('{}'): {}", base_url, e))
            })?;
        }
        if let Some(service) = &self.tool_service {
            Url::parse(&service.url).map_err(|e| {
                RelayError::config(format!(
                    "Invalid URL format for 'tool_service.url' ('{}'): {}",
                    service.url, e
                ))
            })?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
