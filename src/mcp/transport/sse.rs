//! Event-stream transport
//!
//! [`SseTransport`] holds a persistent HTTP client session for one server
//! URL. Each request is POSTed as JSON; the server answers either with a
//! JSON body or with a `text/event-stream` whose first data event is the
//! response. No credential exchange is performed.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{McpHostError, Result};
use crate::mcp::config::TransportKind;
use crate::mcp::transport::http::HttpSession;
use crate::mcp::transport::Transport;
use crate::mcp::types::WireRequest;

/// Capability server reached through an event-stream session.
#[derive(Debug)]
pub struct SseTransport {
    server_name: String,
    url: Option<String>,
    timeout: Duration,
    session: RwLock<Option<HttpSession>>,
}

impl SseTransport {
    /// Create an unconnected client.
    pub fn new(server_name: String, url: Option<String>, timeout: Duration) -> Self {
        Self {
            server_name,
            url,
            timeout,
            session: RwLock::new(None),
        }
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    /// Open the client session.
    ///
    /// # Errors
    ///
    /// Returns [`McpHostError::Config`] when the URL is missing or invalid.
    async fn initialize(&self) -> Result<()> {
        let session = HttpSession::open(&self.server_name, self.url.as_deref(), self.timeout)?;
        *self.session.write().await = Some(session);
        tracing::debug!(server = %self.server_name, "Opened event-stream session");
        Ok(())
    }

    async fn round_trip(&self, request: &WireRequest) -> Result<Value> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| McpHostError::NotInitialized(self.server_name.clone()))?;
        session.post(request).await
    }

    async fn close(&self) -> Result<()> {
        if self.session.write().await.take().is_some() {
            tracing::debug!(server = %self.server_name, "Closed event-stream session");
        }
        Ok(())
    }
}
