//! Test utilities for mcphost
//!
//! Scripted model providers and registry helpers shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{McpHostError, Result};
use crate::mcp::registry::ServerRegistry;
use crate::mcp::transport::fake::FakeTransport;
use crate::providers::{Provider, Turn};

/// Provider that replays canned replies and records every history it saw
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedProvider {
    /// Reply with `replies` in order
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failing call after the replies already queued
    pub fn then_fail(self, message: &str) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(message.to_string()));
        }
        self
    }

    /// Histories passed to each `generate` call, in call order
    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.seen().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, history: &[Turn]) -> Result<String> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(history.to_vec());
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(McpHostError::Provider(message).into()),
            None => Err(McpHostError::Provider("script exhausted".to_string()).into()),
        }
    }
}

/// Register each fake and share the registry
///
/// # Panics
///
/// Panics if a fake fails to initialize
pub async fn registry_with(fakes: Vec<FakeTransport>) -> Arc<ServerRegistry> {
    let mut registry = ServerRegistry::new();
    for fake in fakes {
        registry
            .register(Arc::new(fake))
            .await
            .expect("fake transport failed to register");
    }
    Arc::new(registry)
}
