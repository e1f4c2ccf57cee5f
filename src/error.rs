//! Error types for mcphost
//!
//! This module defines all error types used throughout the host,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for mcphost operations
///
/// The variants mirror the failure classes of the fulfillment loop:
/// configuration problems that keep a server out of the registry,
/// transport failures that are degraded at the client boundary, marker
/// protocol problems that are skipped, and model failures that abort an
/// exchange.
#[derive(Error, Debug)]
pub enum McpHostError {
    /// Configuration-related errors (missing transport fields, failed
    /// credential exchange, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model provider errors (API calls, malformed responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Missing credentials for a model provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Transport-level failures talking to a capability server
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or invalid capability request markers
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Credential exchange with a capability server was rejected
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A transport client was used before `initialize` succeeded
    #[error("Client not initialized for {0}")]
    NotInitialized(String),

    /// An operation exceeded its deadline
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// The configured limit in seconds
        seconds: u64,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for mcphost operations
///
/// Uses `anyhow::Error` so that context can be attached while still allowing
/// callers to `downcast_ref::<McpHostError>()` when they need the class.
pub type Result<T> = anyhow::Result<T>;
