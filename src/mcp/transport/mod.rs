//! Capability server transports
//!
//! This module defines the [`Transport`] trait that every capability server
//! client satisfies. Concrete implementations live in submodules:
//!
//! - [`stdio::StdioTransport`] -- spawns a child process and exchanges one
//!   JSON object per line over its pipes.
//! - [`sse::SseTransport`] -- posts requests to a persistent client session
//!   and reads the answer from an event stream.
//! - [`http::HttpTransport`] -- plain HTTP POST with an optional credential
//!   exchange at initialization.
//! - [`fake::FakeTransport`] -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! # Design
//!
//! A concrete transport only implements framing: [`Transport::round_trip`]
//! sends one [`WireRequest`] and returns the raw JSON answer. Listing and
//! invocation are provided methods layered on top, so normalization and
//! failure degradation behave the same for every transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{McpHostError, Result};
use crate::mcp::config::{McpServerConfig, TransportConfig, TransportKind};
use crate::mcp::types::{
    listing_entries, InvokeOutcome, RequestKind, ResourceInfo, ToolInfo, WireRequest,
};

#[cfg(test)]
pub mod fake;
pub mod http;
pub mod sse;
pub mod stdio;

/// Client for one capability server.
///
/// Lifecycle is `new -> initialize -> (list | invoke)* -> close`. All methods
/// take `&self` so a client can be shared through `Arc<dyn Transport>` by
/// concurrent dispatches; implementations serialize I/O internally where the
/// medium requires it.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Registry name of the server this client talks to.
    fn server_name(&self) -> &str;

    /// Transport family.
    fn kind(&self) -> TransportKind;

    /// Establish the session.
    ///
    /// # Errors
    ///
    /// Returns [`McpHostError::Config`] when required settings are missing
    /// or a credential exchange fails, and [`McpHostError::Transport`] when
    /// the session cannot be opened.
    async fn initialize(&self) -> Result<()>;

    /// Send one request and return the server's raw JSON answer.
    ///
    /// # Errors
    ///
    /// Returns [`McpHostError::NotInitialized`] before a successful
    /// [`Transport::initialize`] and [`McpHostError::Transport`] for any
    /// I/O, status or decoding failure.
    async fn round_trip(&self, request: &WireRequest) -> Result<Value>;

    /// Tear down the session. Idempotent; never fails on an already-closed
    /// client.
    async fn close(&self) -> Result<()>;

    /// Enumerate the server's tools. Failures are logged and yield an empty
    /// list.
    async fn list_tools(&self) -> Vec<ToolInfo> {
        let entries = match self.round_trip(&WireRequest::list_tools()).await {
            Ok(response) => listing_entries(&response, "tools"),
            Err(e) => Err(e),
        };
        match entries {
            Ok(entries) => parse_entries(self.server_name(), &entries, ToolInfo::from_value),
            Err(e) => {
                tracing::error!(server = %self.server_name(), "Error listing tools: {}", e);
                Vec::new()
            }
        }
    }

    /// Enumerate the server's resources. Failures are logged and yield an
    /// empty list.
    async fn list_resources(&self) -> Vec<ResourceInfo> {
        let entries = match self.round_trip(&WireRequest::list_resources()).await {
            Ok(response) => listing_entries(&response, "resources"),
            Err(e) => Err(e),
        };
        match entries {
            Ok(entries) => parse_entries(self.server_name(), &entries, |v| {
                Ok(serde_json::from_value(v.clone())?)
            }),
            Err(e) => {
                tracing::error!(server = %self.server_name(), "Error listing resources: {}", e);
                Vec::new()
            }
        }
    }

    /// Read a resource or call a tool.
    ///
    /// Backend failures come back as [`InvokeOutcome::Error`].
    ///
    /// # Errors
    ///
    /// Only [`McpHostError::NotInitialized`] is returned as an error.
    async fn invoke(
        &self,
        kind: RequestKind,
        name: &str,
        params: &Map<String, Value>,
    ) -> Result<InvokeOutcome> {
        invoke_via_round_trip(self, kind, name, params).await
    }
}

/// Shared body of [`Transport::invoke`].
///
/// Kept as a free function so implementations that override `invoke` can
/// still fall back to the standard behavior.
pub async fn invoke_via_round_trip<T: Transport + ?Sized>(
    transport: &T,
    kind: RequestKind,
    name: &str,
    params: &Map<String, Value>,
) -> Result<InvokeOutcome> {
    let request = WireRequest::invoke(kind, name, params);
    match transport.round_trip(&request).await {
        Ok(response) => Ok(InvokeOutcome::from_response(kind, response)),
        Err(e) => {
            if let Some(McpHostError::NotInitialized(_)) = e.downcast_ref::<McpHostError>() {
                return Err(e);
            }
            tracing::error!(
                server = %transport.server_name(),
                kind = %kind,
                name,
                "Error invoking capability: {}",
                e
            );
            Ok(InvokeOutcome::error(e.to_string()))
        }
    }
}

fn parse_entries<T>(
    server: &str,
    entries: &[Value],
    parse: impl Fn(&Value) -> Result<T>,
) -> Vec<T> {
    entries
        .iter()
        .filter_map(|entry| match parse(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(server, "Skipping malformed listing entry {}: {}", entry, e);
                None
            }
        })
        .collect()
}

/// Build the client for a configured server.
///
/// No I/O happens here; missing settings surface from
/// [`Transport::initialize`].
pub fn create_transport(config: &McpServerConfig) -> Arc<dyn Transport> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    match &config.transport {
        TransportConfig::Stdio { command, args, env } => Arc::new(stdio::StdioTransport::new(
            config.name.clone(),
            command.clone(),
            args.clone(),
            env.clone(),
            timeout,
        )),
        TransportConfig::Sse { url } => Arc::new(sse::SseTransport::new(
            config.name.clone(),
            url.clone(),
            timeout,
        )),
        TransportConfig::Http { url, auth } => Arc::new(http::HttpTransport::new(
            config.name.clone(),
            url.clone(),
            auth.clone(),
            timeout,
        )),
    }
}
