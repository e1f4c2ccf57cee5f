//! Registry of connected capability servers
//!
//! Built once at host startup: every configured server is initialized and
//! asked for its tools and resources. A server whose initialization fails is
//! left out and reported; the others still register. After startup the
//! registry is shared read-only behind an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::mcp::config::{McpServerConfig, TransportKind};
use crate::mcp::transport::{create_transport, Transport};
use crate::mcp::types::{ResourceInfo, ServerCapabilities, ToolInfo};

/// A server that initialized successfully.
#[derive(Debug, Clone)]
pub struct RegisteredServer {
    /// Unique registry name
    pub name: String,
    /// The server's client
    pub client: Arc<dyn Transport>,
    /// Tools discovered at startup
    pub tools: Vec<ToolInfo>,
    /// Resources discovered at startup
    pub resources: Vec<ResourceInfo>,
}

impl RegisteredServer {
    /// Transport family of the client.
    pub fn kind(&self) -> TransportKind {
        self.client.kind()
    }

    /// Names of the discovered resources and tools.
    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            resources: self.resources.iter().map(|r| r.name.clone()).collect(),
            tools: self.tools.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// A server that could not be initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerFailure {
    /// Configured name
    pub name: String,
    /// Why initialization failed
    pub error: String,
}

/// Name to client mapping for every registered server.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: BTreeMap<String, RegisteredServer>,
}

impl ServerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize every configured server, in order.
    ///
    /// Returns the registry of servers that came up and the failures of
    /// those that did not.
    pub async fn connect(configs: &[McpServerConfig]) -> (Self, Vec<ServerFailure>) {
        let mut registry = Self::new();
        let mut failures = Vec::new();

        for config in configs {
            let client = create_transport(config);
            if let Err(e) = registry.register(client).await {
                tracing::error!(server = %config.name, "Failed to initialize MCP server: {}", e);
                failures.push(ServerFailure {
                    name: config.name.clone(),
                    error: e.to_string(),
                });
            }
        }

        (registry, failures)
    }

    /// Initialize a client, discover its capabilities and add it.
    ///
    /// A client registered under an existing name replaces it.
    ///
    /// # Errors
    ///
    /// Propagates the client's initialization error; the registry is left
    /// unchanged.
    pub async fn register(&mut self, client: Arc<dyn Transport>) -> Result<()> {
        let name = client.server_name().to_string();
        client.initialize().await?;

        let tools = client.list_tools().await;
        let resources = client.list_resources().await;
        tracing::info!(
            server = %name,
            transport = %client.kind(),
            tools = tools.len(),
            resources = resources.len(),
            "Initialized MCP server"
        );

        let previous = self.servers.insert(
            name.clone(),
            RegisteredServer {
                name,
                client,
                tools,
                resources,
            },
        );
        if let Some(previous) = previous {
            tracing::warn!(server = %previous.name, "Replacing registered MCP server");
            let _ = previous.client.close().await;
        }
        Ok(())
    }

    /// Look up a server by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredServer> {
        self.servers.get(name)
    }

    /// Whether a server is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    /// Registered servers, ordered by name.
    pub fn servers(&self) -> impl Iterator<Item = &RegisteredServer> {
        self.servers.values()
    }

    /// Number of registered servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether no server is registered.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Server name to discovered capability names.
    pub fn capabilities(&self) -> BTreeMap<String, ServerCapabilities> {
        self.servers
            .iter()
            .map(|(name, server)| (name.clone(), server.capabilities()))
            .collect()
    }

    /// Close every client. Errors are logged; closing is idempotent.
    pub async fn close_all(&self) {
        for server in self.servers.values() {
            if let Err(e) = server.client.close().await {
                tracing::warn!(server = %server.name, "Error closing MCP server: {}", e);
            }
        }
    }
}
