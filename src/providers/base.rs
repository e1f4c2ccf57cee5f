//! Base provider trait and conversation turn types
//!
//! This module defines the [`Provider`] trait every model backend
//! implements, along with the role-tagged [`Turn`] that makes up a
//! conversation history.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Host-injected guidance or fulfillment results
    System,
    /// The human
    User,
    /// The model
    Assistant,
}

impl Role {
    /// Wire spelling used by every supported provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the content
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Turn {
    /// Creates a new user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use mcphost::providers::{Role, Turn};
    ///
    /// let turn = Turn::user("Hello, assistant!");
    /// assert_eq!(turn.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Creates a new system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Model invocation backend
///
/// Implementations turn a conversation history into the model's next reply.
/// Failures propagate to the caller; no retry is attempted.
///
/// # Examples
///
/// ```no_run
/// use mcphost::providers::{Provider, Turn};
/// use mcphost::error::Result;
/// use async_trait::async_trait;
///
/// struct Parrot;
///
/// #[async_trait]
/// impl Provider for Parrot {
///     fn name(&self) -> &str {
///         "parrot"
///     }
///
///     async fn generate(&self, history: &[Turn]) -> Result<String> {
///         Ok(history.last().map(|t| t.content.clone()).unwrap_or_default())
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider identifier used in logs
    fn name(&self) -> &str;

    /// Generate the assistant's reply to `history`
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing, the API call fails or the
    /// response is malformed
    async fn generate(&self, history: &[Turn]) -> Result<String>;
}
