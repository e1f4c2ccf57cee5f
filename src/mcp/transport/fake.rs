//! In-process scripted transport for unit tests
//!
//! [`FakeTransport`] answers [`WireRequest`]s from canned responses so the
//! registry, dispatcher and conversation loop can be driven without
//! spawning processes or opening sockets.
//!
//! ```text
//! with_tools(..)              -> answer to list_tools
//! with_resources(..)          -> answer to list_resources
//! with_response(name, ..)     -> answer to resource/tool `name`
//! with_transport_failure(..)  -> round_trip error, degraded by invoke
//! with_raise(..)              -> invoke itself returns an error
//! with_delay(..)              -> sleep before answering `name`
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::error::{McpHostError, Result};
use crate::mcp::config::TransportKind;
use crate::mcp::transport::{invoke_via_round_trip, Transport};
use crate::mcp::types::{InvokeOutcome, RequestKind, WireOperation, WireRequest};

/// Scripted in-memory [`Transport`].
#[derive(Debug)]
pub struct FakeTransport {
    name: String,
    tools: Value,
    resources: Value,
    responses: HashMap<String, Value>,
    transport_failures: HashMap<String, String>,
    raises: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    init_failure: Option<String>,
    initialized: AtomicBool,
    close_calls: AtomicUsize,
    sent: Mutex<Vec<WireRequest>>,
}

impl FakeTransport {
    /// Create a fake with empty listings and no scripted answers.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tools: json!([]),
            resources: json!([]),
            responses: HashMap::new(),
            transport_failures: HashMap::new(),
            raises: HashMap::new(),
            delays: HashMap::new(),
            init_failure: None,
            initialized: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Answer `list_tools` with `listing`.
    pub fn with_tools(mut self, listing: Value) -> Self {
        self.tools = listing;
        self
    }

    /// Answer `list_resources` with `listing`.
    pub fn with_resources(mut self, listing: Value) -> Self {
        self.resources = listing;
        self
    }

    /// Answer invocations of `name` with `response`.
    pub fn with_response(mut self, name: &str, response: Value) -> Self {
        self.responses.insert(name.to_string(), response);
        self
    }

    /// Fail the round trip for `name` with a transport error.
    pub fn with_transport_failure(mut self, name: &str, message: &str) -> Self {
        self.transport_failures
            .insert(name.to_string(), message.to_string());
        self
    }

    /// Make `invoke` for `name` return an error instead of an outcome.
    pub fn with_raise(mut self, name: &str, message: &str) -> Self {
        self.raises.insert(name.to_string(), message.to_string());
        self
    }

    /// Delay the answer for `name`.
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Fail `initialize` with a configuration error.
    pub fn with_init_failure(mut self, message: &str) -> Self {
        self.init_failure = Some(message.to_string());
        self
    }

    /// Requests received so far, in arrival order.
    pub fn sent(&self) -> Vec<WireRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// How many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    fn server_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    async fn initialize(&self) -> Result<()> {
        if let Some(message) = &self.init_failure {
            return Err(McpHostError::Config(message.clone()).into());
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn round_trip(&self, request: &WireRequest) -> Result<Value> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(McpHostError::NotInitialized(self.name.clone()).into());
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }

        let name = request.name.clone().unwrap_or_default();
        if let Some(delay) = self.delays.get(&name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.transport_failures.get(&name) {
            return Err(McpHostError::Transport(message.clone()).into());
        }

        match request.operation {
            WireOperation::ListTools => Ok(self.tools.clone()),
            WireOperation::ListResources => Ok(self.resources.clone()),
            WireOperation::Resource | WireOperation::Tool => Ok(self
                .responses
                .get(&name)
                .cloned()
                .unwrap_or_else(|| json!({"error": format!("unknown capability '{}'", name)}))),
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn invoke(
        &self,
        kind: RequestKind,
        name: &str,
        params: &Map<String, Value>,
    ) -> Result<InvokeOutcome> {
        if let Some(message) = self.raises.get(name) {
            return Err(anyhow::anyhow!(message.clone()));
        }
        invoke_via_round_trip(self, kind, name, params).await
    }
}
