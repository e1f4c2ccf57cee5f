//! Anthropic messages provider
//!
//! The messages API takes system guidance as a top-level field and expects
//! user and assistant turns to alternate. The first system turn becomes the
//! `system` field; later system turns (such as fulfillment results) are sent
//! as user turns, and consecutive turns with the same role are merged.

use crate::config::ProviderConfig;
use crate::error::{McpHostError, Result};
use crate::providers::{Provider, Role, Turn};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value sent in the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages API provider
pub struct AnthropicProvider {
    client: Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider instance
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
            "Initialized Anthropic provider: api_base={}, model={}",
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

/// Split a history into the `system` field and alternating messages.
fn convert_history(history: &[Turn]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = None;
    let mut messages: Vec<AnthropicMessage> = Vec::new();

    for turn in history {
        let role = match turn.role {
            Role::System if system.is_none() && messages.is_empty() => {
                system = Some(turn.content.clone());
                continue;
            }
            Role::System | Role::User => "user",
            Role::Assistant => "assistant",
        };

        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&turn.content);
            }
            _ => messages.push(AnthropicMessage {
                role,
                content: turn.content.clone(),
            }),
        }
    }

    (system, messages)
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, history: &[Turn]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| McpHostError::MissingCredentials("anthropic".to_string()))?;

        let (system, messages) = convert_history(history);
        let request = MessagesRequest {
            model: self.model.clone(),
            messages,
            system,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            "Sending Anthropic request: {} messages, system={}",
            request.messages.len(),
            request.system.is_some()
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Anthropic request failed: {}", e);
                McpHostError::Provider(format!("Anthropic request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Anthropic returned error {}: {}", status, error_text);
            return Err(McpHostError::Provider(format!(
                "Anthropic returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: MessagesResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Anthropic response: {}", e);
            McpHostError::Provider(format!("Failed to parse Anthropic response: {}", e))
        })?;

        let texts: Vec<String> = body
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();
        if texts.is_empty() {
            return Err(McpHostError::Provider(
                "Anthropic response contained no text content".to_string(),
            )
            .into());
        }
        Ok(texts.join(""))
    }
}
