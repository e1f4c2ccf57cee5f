//! Fulfillment dispatcher
//!
//! Runs a batch of [`CapabilityRequest`]s against the registry and assembles
//! a [`FulfillmentBundle`]:
//!
//! - request to an unregistered server: warned about and dropped, no entry
//! - success: normalized result under the request id
//! - error or timeout: error string under `"{server}_{name}_error"`
//!
//! Requests run concurrently up to a limit. Results are assembled in input
//! order after every request has finished, so bundle keys do not depend on
//! completion order and one failure never cancels its siblings.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::error::McpHostError;
use crate::mcp::registry::ServerRegistry;
use crate::mcp::types::{CapabilityRequest, FulfillmentBundle};

/// Default number of requests in flight at once.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Outcome of one request before bundle assembly.
#[derive(Debug)]
enum Entry {
    Success { key: String, value: Value },
    Failure { key: String, message: String },
}

/// Executes capability requests against registered servers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ServerRegistry>,
    max_concurrent: usize,
    request_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry.
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self {
            registry,
            max_concurrent: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: None,
        }
    }

    /// Limit how many requests run at once (minimum 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Bound each request; an expired request is recorded under its error
    /// key.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The registry requests are dispatched against.
    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    /// Fulfill a batch of requests.
    ///
    /// Never fails; an empty batch yields an empty bundle.
    ///
    /// When two entries would share a key, later ones get `_2`, `_3`, ...
    /// appended so no result is lost.
    pub async fn fulfill(&self, requests: &[CapabilityRequest]) -> FulfillmentBundle {
        let entries: Vec<Option<Entry>> = stream::iter(requests.iter().map(|r| self.fulfill_one(r)))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut bundle = FulfillmentBundle::new();
        for entry in entries.into_iter().flatten() {
            let (key, value) = match entry {
                Entry::Success { key, value } => (key, value),
                Entry::Failure { key, message } => (key, Value::String(message)),
            };
            let key = unique_key(&bundle, key);
            bundle.insert(key, value);
        }

        tracing::debug!(
            requested = requests.len(),
            fulfilled = bundle.len(),
            "Fulfilled MCP requests"
        );
        bundle
    }

    async fn fulfill_one(&self, request: &CapabilityRequest) -> Option<Entry> {
        let Some(server) = self.registry.get(&request.server) else {
            tracing::warn!(server = %request.server, name = %request.name, "Unknown MCP server, dropping request");
            return None;
        };

        tracing::debug!(
            server = %request.server,
            kind = %request.kind,
            name = %request.name,
            "Dispatching MCP request"
        );
        let call = server
            .client
            .invoke(request.kind, &request.name, &request.params);

        let result = match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(McpHostError::Timeout {
                    operation: format!("{} {} on {}", request.kind, request.name, request.server),
                    seconds: limit.as_secs(),
                }
                .into()),
            },
            None => call.await,
        };

        let outcome = result.and_then(|outcome| Ok(serde_json::to_value(outcome)?));
        Some(match outcome {
            Ok(value) => Entry::Success {
                key: request.id(),
                value,
            },
            Err(e) => {
                let params = Value::Object(request.params.clone());
                tracing::error!(
                    server = %request.server,
                    kind = %request.kind,
                    name = %request.name,
                    params = %params,
                    "Error fulfilling MCP request: {}",
                    e
                );
                Entry::Failure {
                    key: request.error_key(),
                    message: e.to_string(),
                }
            }
        })
    }
}

fn unique_key(bundle: &FulfillmentBundle, key: String) -> String {
    if !bundle.contains_key(&key) {
        return key;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}_{}", key, suffix);
        if !bundle.contains_key(&candidate) {
            tracing::debug!(key = %key, renamed = %candidate, "Duplicate result key");
            return candidate;
        }
        suffix += 1;
    }
}
