//! mcphost - MCP host library
//!
//! This library brokers between a language model and a set of MCP capability
//! servers. The model asks for resources and tools by embedding `mcp` marker
//! blocks in its replies; the host fulfills them and feeds the results back
//! for a second, final reply.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Conversation history and the two-pass controller
//! - `mcp`: Markers, transports, the server registry and the dispatcher
//! - `providers`: Model provider abstraction (OpenAI, Anthropic, Ollama)
//! - `host`: Startup, shutdown and the per-message entry point
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use mcphost::{Config, Host};
//! use mcphost::providers::create_provider;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let host = Host::start(&config, create_provider(&config.provider)?).await;
//!     let exchange = host.process_message("What's the weather in Paris?", Vec::new()).await?;
//!     println!("{}", exchange.response);
//!     host.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod mcp;
pub mod providers;

// Re-export commonly used types
pub use agent::{Agent, Exchange};
pub use config::Config;
pub use error::{McpHostError, Result};
pub use host::{Host, StartupReport};

#[cfg(test)]
pub mod test_utils;
