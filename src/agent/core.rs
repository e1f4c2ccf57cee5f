//! Conversation loop controller
//!
//! Drives one user turn through the model, fulfilling any capability requests
//! the model embeds in its reply:
//!
//! 1. invoke the model with the history plus the new user turn
//! 2. extract request markers from the reply
//! 3. when there are requests, fulfill them, hand the results back as a
//!    system turn and invoke the model a second time
//! 4. strip markers from the final reply and append it as the assistant turn
//!
//! Markers in the second reply are removed but never fulfilled, so one user
//! turn costs at most two model invocations.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::marker::{extract_requests, format_results_for_model};
use crate::mcp::types::FulfillmentBundle;
use crate::providers::{Provider, Turn};

use super::Conversation;

/// Where an exchange is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    /// Waiting on a model reply
    AwaitingModel,
    /// Waiting on the dispatcher
    AwaitingFulfillment,
    /// Final reply appended
    Done,
}

/// Result of processing one user message
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Reply shown to the user, markers removed
    pub response: String,
    /// Full history including the new turns
    pub history: Vec<Turn>,
    /// Results gathered for the model, if it asked for any
    pub bundle: Option<FulfillmentBundle>,
    /// Phases passed through, in order
    pub phases: Vec<ExchangePhase>,
}

impl Exchange {
    /// Number of model invocations the exchange took
    pub fn model_calls(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| **p == ExchangePhase::AwaitingModel)
            .count()
    }
}

/// Runs the two-pass request/fulfill/respond loop
///
/// # Examples
///
/// ```ignore
/// use mcphost::agent::Agent;
///
/// # async fn example(agent: Agent) -> mcphost::error::Result<()> {
/// let exchange = agent.process_message("What's the weather?", Vec::new()).await?;
/// println!("{}", exchange.response);
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    provider: Arc<dyn Provider>,
    dispatcher: Dispatcher,
    guidance: String,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider.name())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Agent {
    /// Creates a controller
    ///
    /// # Arguments
    ///
    /// * `provider` - Model invoked on each pass
    /// * `dispatcher` - Fulfills the requests the model makes
    /// * `guidance` - System prompt prepended to an empty history
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: Dispatcher,
        guidance: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            guidance: guidance.into(),
        }
    }

    /// The guidance prompt
    pub fn guidance(&self) -> &str {
        &self.guidance
    }

    /// The dispatcher requests go through
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Processes one user message
    ///
    /// The caller's history is consumed and returned, extended, inside the
    /// [`Exchange`]. A model failure on either pass aborts the exchange and
    /// nothing is returned, so a caller that kept its own copy still has the
    /// history from before the message.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if a model invocation fails
    pub async fn process_message(&self, message: &str, history: Vec<Turn>) -> Result<Exchange> {
        let mut conversation = Conversation::from_turns(history);
        let mut phases = Vec::new();

        if conversation.is_empty() {
            debug!("Prepending guidance to a fresh conversation");
            conversation.add_system_message(self.guidance.clone());
        }
        conversation.add_user_message(message);

        phases.push(ExchangePhase::AwaitingModel);
        let first = self.provider.generate(conversation.turns()).await?;
        let (cleaned, requests) = extract_requests(&first);

        if requests.is_empty() {
            conversation.add_assistant_message(cleaned.clone());
            phases.push(ExchangePhase::Done);
            return Ok(Exchange {
                response: cleaned,
                history: conversation.into_turns(),
                bundle: None,
                phases,
            });
        }

        info!(requests = requests.len(), "Model requested MCP capabilities");
        phases.push(ExchangePhase::AwaitingFulfillment);
        let bundle = self.dispatcher.fulfill(&requests).await;
        conversation.add_system_message(format_results_for_model(&bundle));

        phases.push(ExchangePhase::AwaitingModel);
        let second = self.provider.generate(conversation.turns()).await?;
        let (cleaned, ignored) = extract_requests(&second);
        if !ignored.is_empty() {
            warn!(
                requests = ignored.len(),
                "Ignoring MCP requests in the follow-up reply"
            );
        }

        conversation.add_assistant_message(cleaned.clone());
        phases.push(ExchangePhase::Done);
        Ok(Exchange {
            response: cleaned,
            history: conversation.into_turns(),
            bundle: Some(bundle),
            phases,
        })
    }
}
