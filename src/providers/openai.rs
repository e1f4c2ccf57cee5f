//! OpenAI-compatible provider
//!
//! Talks to any endpoint implementing `POST {api_base}/chat/completions`
//! with bearer authentication.

use crate::config::ProviderConfig;
use crate::error::{McpHostError, Result};
use crate::providers::{Provider, Turn};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI chat completions provider
///
/// # Examples
///
/// ```
/// use mcphost::config::ProviderConfig;
/// use mcphost::providers::OpenAiProvider;
///
/// let config = ProviderConfig {
///     provider_type: "openai".to_string(),
///     ..Default::default()
/// };
/// let provider = OpenAiProvider::new(&config).unwrap();
/// assert_eq!(provider.model(), "gpt-4o-mini");
/// ```
pub struct OpenAiProvider {
    client: Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider instance
    ///
    /// The API key is resolved now; a missing key is reported on the first
    /// generation call.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("mcphost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpHostError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        let provider = Self {
            client,
            api_base: config.api_base_or_default(),
            model: config.model_or_default(),
            api_key: config.resolved_api_key(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        };
        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            provider.api_base,
            provider.model
        );
        Ok(provider)
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, history: &[Turn]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| McpHostError::MissingCredentials("openai".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: history
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        tracing::debug!("Sending OpenAI request: {} messages", request.messages.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenAI request failed: {}", e);
                McpHostError::Provider(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI returned error {}: {}", status, error_text);
            return Err(McpHostError::Provider(format!(
                "OpenAI returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}", e);
            McpHostError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| {
                McpHostError::Provider("OpenAI response contained no choices".to_string()).into()
            })
    }
}
