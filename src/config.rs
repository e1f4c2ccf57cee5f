//! Configuration management for mcphost
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{McpHostError, Result};
use crate::mcp::config::McpConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Provider types accepted in `provider.type`.
pub const VALID_PROVIDERS: [&str; 3] = ["openai", "anthropic", "ollama"];

/// Main configuration structure for mcphost
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Capability servers
    #[serde(default)]
    pub mcp: McpConfig,
    /// Fulfillment loop limits
    #[serde(default)]
    pub host: HostConfig,
}

/// Provider configuration
///
/// Specifies which model provider to use and its sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// Model identifier; each provider has its own default
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL; each provider has its own default
    #[serde(default)]
    pub api_base: Option<String>,

    /// API key, or a `${VAR}` placeholder read from the environment
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling threshold
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for one generation call
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_provider_type() -> String {
    "ollama".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model: None,
            api_base: None,
            api_key: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

impl ProviderConfig {
    /// The configured model, or the provider's default.
    pub fn model_or_default(&self) -> String {
        if let Some(model) = self.model.as_deref().filter(|m| !m.is_empty()) {
            return model.to_string();
        }
        match self.provider_type.as_str() {
            "openai" => "gpt-4o-mini",
            "anthropic" => "claude-3-5-sonnet-latest",
            _ => "llama3.2:latest",
        }
        .to_string()
    }

    /// The configured API base, or the provider's default, without a
    /// trailing slash.
    pub fn api_base_or_default(&self) -> String {
        let base = match self.api_base.as_deref().filter(|b| !b.is_empty()) {
            Some(base) => base,
            None => match self.provider_type.as_str() {
                "openai" => "https://api.openai.com/v1",
                "anthropic" => "https://api.anthropic.com",
                _ => "http://localhost:11434",
            },
        };
        base.trim_end_matches('/').to_string()
    }

    /// Resolve the API key.
    ///
    /// A `${VAR}` value is read from the environment. Without a configured
    /// key, `OPENAI_API_KEY` or `ANTHROPIC_API_KEY` is used for the matching
    /// provider.
    pub fn resolved_api_key(&self) -> Option<String> {
        let configured = self.api_key.as_deref().and_then(resolve_env_placeholder);
        configured
            .or_else(|| {
                let fallback = match self.provider_type.as_str() {
                    "openai" => "OPENAI_API_KEY",
                    "anthropic" => "ANTHROPIC_API_KEY",
                    _ => return None,
                };
                std::env::var(fallback).ok()
            })
            .filter(|key| !key.is_empty())
    }
}

/// Expand a whole-value `${VAR}` placeholder; other values pass through.
fn resolve_env_placeholder(value: &str) -> Option<String> {
    match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => {
            let resolved = std::env::var(var).ok();
            if resolved.is_none() {
                tracing::warn!("Environment variable {} referenced in config is not set", var);
            }
            resolved
        }
        None => Some(value.to_string()),
    }
}

/// Fulfillment loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Requests dispatched at once within one batch
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Deadline for one capability request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Deadline for a whole exchange (both model passes); unbounded if unset
    #[serde(default)]
    pub exchange_timeout_seconds: Option<u64>,
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_seconds: default_request_timeout(),
            exchange_timeout_seconds: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| McpHostError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| McpHostError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("MCPHOST_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("MCPHOST_MODEL") {
            self.provider.model = Some(model);
        }

        if let Ok(api_base) = std::env::var("MCPHOST_API_BASE") {
            self.provider.api_base = Some(api_base);
        }

        if let Ok(api_key) = std::env::var("MCPHOST_API_KEY") {
            self.provider.api_key = Some(api_key);
        }

        if let Ok(max_concurrent) = std::env::var("MCPHOST_MAX_CONCURRENT_REQUESTS") {
            if let Ok(value) = max_concurrent.parse() {
                self.host.max_concurrent_requests = value;
            } else {
                tracing::warn!("Invalid MCPHOST_MAX_CONCURRENT_REQUESTS: {}", max_concurrent);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(provider) = &cli.provider {
            self.provider.provider_type = provider.clone();
        }
        if let Some(model) = &cli.model {
            self.provider.model = Some(model.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// Transport fields of individual servers are checked when each server
    /// initializes, so a single bad server entry does not fail validation.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(McpHostError::Config("Provider type cannot be empty".to_string()).into());
        }

        if !VALID_PROVIDERS.contains(&self.provider.provider_type.as_str()) {
            return Err(McpHostError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                VALID_PROVIDERS.join(", ")
            ))
            .into());
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(McpHostError::Config(
                "provider.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.provider.top_p) {
            return Err(
                McpHostError::Config("provider.top_p must be between 0.0 and 1.0".to_string())
                    .into(),
            );
        }

        if self.provider.max_tokens == 0 {
            return Err(McpHostError::Config(
                "provider.max_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(McpHostError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.host.max_concurrent_requests == 0 {
            return Err(McpHostError::Config(
                "host.max_concurrent_requests must be greater than 0".to_string(),
            )
            .into());
        }

        if self.host.request_timeout_seconds == 0 {
            return Err(McpHostError::Config(
                "host.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.host.exchange_timeout_seconds == Some(0) {
            return Err(McpHostError::Config(
                "host.exchange_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        self.mcp.validate()
    }
}
