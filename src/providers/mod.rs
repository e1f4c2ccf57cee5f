//! Provider module for mcphost
//!
//! This module contains the model provider abstraction and implementations
//! for OpenAI-compatible endpoints, Anthropic and Ollama.

pub mod anthropic;
pub mod base;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use base::{Provider, Role, Turn};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration; `config.provider_type` selects the
///   implementation ("openai", "anthropic" or "ollama")
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        "anthropic" => Ok(Arc::new(AnthropicProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        other => Err(crate::error::McpHostError::Config(format!(
            "Unknown provider type: {}",
            other
        ))
        .into()),
    }
}
