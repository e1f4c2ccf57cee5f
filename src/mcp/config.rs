//! Capability server configuration types
//!
//! Each entry under `mcp.servers` names one capability server and the
//! transport used to reach it. Transport fields are optional at parse time:
//! a missing `command` or `url` is reported when the client is initialized,
//! so one bad entry keeps only that server out of the registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{McpHostError, Result};

/// Capability server configuration.
///
/// Defaults to no servers so that YAML files without an `mcp:` key still
/// deserialize.
///
/// # Examples
///
/// ```
/// use mcphost::mcp::config::McpConfig;
///
/// let cfg = McpConfig::default();
/// assert!(cfg.servers.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    /// Servers to connect at startup, in registration order
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

impl McpConfig {
    /// Check for duplicate and empty server names.
    ///
    /// # Errors
    ///
    /// Returns [`McpHostError::Config`] naming the offending entry.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(McpHostError::Config("MCP server name cannot be empty".into()).into());
            }
            if !seen.insert(server.name.as_str()) {
                return Err(McpHostError::Config(format!(
                    "Duplicate MCP server name '{}'",
                    server.name
                ))
                .into());
            }
            if server.timeout_seconds == 0 {
                return Err(McpHostError::Config(format!(
                    "MCP server '{}' timeout_seconds must be greater than 0",
                    server.name
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// One capability server entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Registry name; model requests address the server by this name
    pub name: String,
    /// How to reach the server
    pub transport: TransportConfig,
    /// Per-operation timeout for this server's client
    #[serde(default = "default_server_timeout")]
    pub timeout_seconds: u64,
}

fn default_server_timeout() -> u64 {
    30
}

/// Transport selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Child process speaking newline-delimited JSON
    Stdio {
        /// Executable to launch
        #[serde(default)]
        command: Option<String>,
        /// Arguments for the executable
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment variables layered over the host environment
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Persistent client session answering over an event stream
    Sse {
        /// Server endpoint
        #[serde(default)]
        url: Option<String>,
    },
    /// Plain HTTP with an optional credential exchange
    Http {
        /// Server endpoint
        #[serde(default)]
        url: Option<String>,
        /// Client credentials for the token exchange
        #[serde(default)]
        auth: Option<AuthConfig>,
    },
}

/// Client credentials exchanged for a bearer token.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Client identifier
    #[serde(default)]
    pub client_id: Option<String>,
    /// Client secret
    #[serde(default)]
    pub api_key: Option<String>,
}

impl AuthConfig {
    /// Both halves of the credential, if complete.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.api_key.as_deref()) {
            (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => Some((id, key)),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Transport family, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Child process pipes
    Stdio,
    /// Event stream
    Sse,
    /// Plain HTTP
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::Http => "http",
        };
        f.write_str(s)
    }
}

impl TransportConfig {
    /// The transport family of this entry.
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio { .. } => TransportKind::Stdio,
            Self::Sse { .. } => TransportKind::Sse,
            Self::Http { .. } => TransportKind::Http,
        }
    }
}
