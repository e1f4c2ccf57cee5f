//! Command-line interface definition for mcphost
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for one-shot questions, interactive chat and
//! capability server inspection.

use clap::{Parser, Subcommand};

/// mcphost - broker between a language model and MCP capability servers
///
/// The model asks for resources and tools by embedding `mcp` blocks in its
/// replies; mcphost fulfills them and lets the model answer with the results.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcphost")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the provider from config (openai, anthropic, ollama)
    #[arg(short, long, global = true)]
    pub provider: Option<String>,

    /// Override the model from config
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for mcphost
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The message to send
        message: String,
    },

    /// Start an interactive chat session
    Chat,

    /// List connected servers and their capabilities
    Servers {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            provider: None,
            model: None,
            command: Commands::Servers { json: false },
        }
    }
}
