//! Ollama provider implementation for mcphost
//!
//! This module implements the Provider trait for Ollama, connecting to a
//! local or remote Ollama server through its non-streaming chat endpoint.

use crate::config::ProviderConfig;
use crate::error::{McpHostError, Result};
use crate::providers::{Provider, Turn};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```no_run
/// use mcphost::config::ProviderConfig;
/// use mcphost::providers::{OllamaProvider, Provider, Turn};
///
/// # async fn example() -> mcphost::error::Result<()> {
/// let provider = OllamaProvider::new(&ProviderConfig::default())?;
/// let reply = provider.generate(&[Turn::user("Hello!")]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    client: Client,
    host: String,
    model: String,
    options: OllamaOptions,
}

/// Request structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: &'a OllamaOptions,
}

/// Sampling options for Ollama API
#[derive(Debug, Clone, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

/// Response structure from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use mcphost::config::ProviderConfig;
    /// use mcphost::providers::OllamaProvider;
    ///
    /// let provider = OllamaProvider::new(&ProviderConfig::default()).unwrap();
    /// assert_eq!(provider.host(), "http://localhost:11434");
    /// assert_eq!(provider.model(), "llama3.2:latest");
    /// ```
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("mcphost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpHostError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        let host = config.api_base_or_default();
        let model = config.model_or_default();
        tracing::info!("Initialized Ollama provider: host={}, model={}", host, model);

        Ok(Self {
            client,
            host,
            model,
            options: OllamaOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_predict: config.max_tokens,
            },
        })
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn convert_turns(history: &[Turn]) -> Vec<OllamaMessage> {
        history
            .iter()
            .map(|turn| OllamaMessage {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, history: &[Turn]) -> Result<String> {
        let url = format!("{}/api/chat", self.host);
        let request = OllamaRequest {
            model: &self.model,
            messages: Self::convert_turns(history),
            stream: false,
            options: &self.options,
        };

        tracing::debug!("Sending Ollama request: {} messages", request.messages.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Ollama request failed: {}", e);
                McpHostError::Provider(format!("Ollama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(McpHostError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            McpHostError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::debug!(
            "Ollama response: done={}, prompt_tokens={}, completion_tokens={}",
            ollama_response.done,
            ollama_response.prompt_eval_count,
            ollama_response.eval_count
        );

        Ok(ollama_response.message.content)
    }
}
