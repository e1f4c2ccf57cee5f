//! Host context
//!
//! Owns the server registry, the dispatcher and the conversation controller
//! for the lifetime of the process. Built once at startup and passed to the
//! command handlers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::agent::{Agent, Exchange};
use crate::config::Config;
use crate::error::{McpHostError, Result};
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::marker::build_guidance_prompt;
use crate::mcp::registry::{ServerFailure, ServerRegistry};
use crate::mcp::types::ServerCapabilities;
use crate::providers::{Provider, Turn};

/// Servers that failed to come up during startup
#[derive(Debug, Clone, Default, Serialize)]
pub struct StartupReport {
    /// One entry per failed server, in configuration order
    pub failures: Vec<ServerFailure>,
}

impl StartupReport {
    /// Whether every configured server came up
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Running host: connected servers plus the controller using them
#[derive(Debug)]
pub struct Host {
    registry: Arc<ServerRegistry>,
    agent: Agent,
    exchange_timeout: Option<Duration>,
    report: StartupReport,
}

impl Host {
    /// Connect every configured server and build the controller
    ///
    /// Servers that fail to initialize are logged and listed in the
    /// [`StartupReport`]; the host starts with the rest.
    pub async fn start(config: &Config, provider: Arc<dyn Provider>) -> Self {
        let (registry, failures) = ServerRegistry::connect(&config.mcp.servers).await;
        for failure in &failures {
            tracing::error!(server = %failure.name, "Server unavailable: {}", failure.error);
        }
        tracing::info!(
            connected = registry.len(),
            failed = failures.len(),
            "MCP servers initialized"
        );

        let mut host = Self::from_registry(Arc::new(registry), provider, config);
        host.report = StartupReport { failures };
        host
    }

    /// Build a host over an already populated registry
    pub fn from_registry(
        registry: Arc<ServerRegistry>,
        provider: Arc<dyn Provider>,
        config: &Config,
    ) -> Self {
        let guidance = build_guidance_prompt(&registry.capabilities());
        let dispatcher = Dispatcher::new(Arc::clone(&registry))
            .with_max_concurrent(config.host.max_concurrent_requests)
            .with_request_timeout(Some(Duration::from_secs(
                config.host.request_timeout_seconds,
            )));

        Self {
            registry,
            agent: Agent::new(provider, dispatcher, guidance),
            exchange_timeout: config.host.exchange_timeout_seconds.map(Duration::from_secs),
            report: StartupReport::default(),
        }
    }

    /// Run one user message through the controller
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or [`McpHostError::Timeout`] when the
    /// exchange outlives `host.exchange_timeout_seconds`. Either way no
    /// history is returned.
    pub async fn process_message(&self, message: &str, history: Vec<Turn>) -> Result<Exchange> {
        let exchange = self.agent.process_message(message, history);
        match self.exchange_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange).await.map_err(|_| {
                McpHostError::Timeout {
                    operation: "exchange".to_string(),
                    seconds: limit.as_secs(),
                }
            })?,
            None => exchange.await,
        }
    }

    /// Resources and tools advertised by each connected server
    pub fn capabilities(&self) -> BTreeMap<String, ServerCapabilities> {
        self.registry.capabilities()
    }

    /// The connected servers
    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    /// Guidance prepended to fresh conversations
    pub fn guidance(&self) -> &str {
        self.agent.guidance()
    }

    /// Startup failures
    pub fn startup_report(&self) -> &StartupReport {
        &self.report
    }

    /// Close every server connection
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down MCP servers");
        self.registry.close_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::config::{McpServerConfig, TransportConfig};
    use crate::mcp::transport::fake::FakeTransport;
    use crate::test_utils::{registry_with, ScriptedProvider};
    use serde_json::json;

    fn weather() -> FakeTransport {
        FakeTransport::new("Weather")
            .with_tools(json!([{"name": "forecast", "description": "Daily forecast"}]))
            .with_resources(json!({"resources": [{"name": "current"}]}))
            .with_response("forecast", json!({"text": "Sunny"}))
    }

    #[tokio::test]
    async fn test_guidance_lists_discovered_servers() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let host = Host::from_registry(
            registry_with(vec![weather()]).await,
            provider,
            &Config::default(),
        );

        assert!(host.guidance().contains("- Weather"));
        assert!(host.guidance().contains("forecast"));
        let capabilities = host.capabilities();
        assert_eq!(capabilities["Weather"].tools, ["forecast"]);
        assert_eq!(capabilities["Weather"].resources, ["current"]);
        assert!(host.startup_report().is_clean());
    }

    #[tokio::test]
    async fn test_start_records_failed_servers() {
        let mut config = Config::default();
        config.mcp.servers.push(McpServerConfig {
            name: "NoCommand".to_string(),
            transport: TransportConfig::Stdio {
                command: None,
                args: Vec::new(),
                env: Default::default(),
            },
            timeout_seconds: 5,
        });
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));

        let host = Host::start(&config, provider).await;
        assert!(host.registry().is_empty());
        assert_eq!(host.startup_report().failures.len(), 1);
        assert_eq!(host.startup_report().failures[0].name, "NoCommand");
        assert!(host.guidance().contains("Available MCP servers: none"));
    }

    #[tokio::test]
    async fn test_process_message_uses_registry() {
        let reply = "```mcp\n{\"type\":\"tool\",\"server\":\"Weather\",\"name\":\"forecast\",\"params\":{}}\n```\n";
        let provider = Arc::new(ScriptedProvider::new([reply, "It will be sunny."]));
        let host = Host::from_registry(
            registry_with(vec![weather()]).await,
            provider,
            &Config::default(),
        );

        let exchange = host.process_message("weather?", Vec::new()).await.unwrap();
        assert_eq!(exchange.response, "It will be sunny.");
        assert_eq!(
            exchange.bundle.unwrap().get("Weather_forecast").unwrap()["text"],
            "Sunny"
        );
    }

    #[tokio::test]
    async fn test_exchange_timeout() {
        let reply = "```mcp\n{\"type\":\"tool\",\"server\":\"Weather\",\"name\":\"forecast\",\"params\":{}}\n```\n";
        let fake = weather().with_delay("forecast", Duration::from_secs(5));
        let provider = Arc::new(ScriptedProvider::new([reply, "late"]));
        let mut config = Config::default();
        config.host.exchange_timeout_seconds = Some(0);
        let host = Host::from_registry(registry_with(vec![fake]).await, provider, &config);

        let history = vec![Turn::user("before")];
        let err = host
            .process_message("weather?", history.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McpHostError>(),
            Some(McpHostError::Timeout { .. })
        ));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_clients() {
        let fake = Arc::new(weather());
        let mut registry = ServerRegistry::new();
        registry.register(fake.clone()).await.unwrap();
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let host = Host::from_registry(Arc::new(registry), provider, &Config::default());

        host.shutdown().await;
        assert_eq!(fake.close_calls(), 1);
    }
}
