//! Conversation history
//!
//! An ordered, append-only list of role-tagged turns. The controller works on
//! an owned copy during an exchange and hands the updated history back to
//! the caller only when the exchange completes.

use crate::providers::{Role, Turn};

/// Ordered conversation history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing history
    ///
    /// # Examples
    ///
    /// ```
    /// use mcphost::agent::Conversation;
    /// use mcphost::providers::Turn;
    ///
    /// let conversation = Conversation::from_turns(vec![Turn::user("hi")]);
    /// assert_eq!(conversation.len(), 1);
    /// ```
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// Append a user turn
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    /// Append an assistant turn
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
    }

    /// Append a system turn
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::system(content));
    }

    /// All turns in order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn with `role`
    pub fn last_with_role(&self, role: Role) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == role)
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Consume into the underlying turns
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

impl From<Vec<Turn>> for Conversation {
    fn from(turns: Vec<Turn>) -> Self {
        Self::from_turns(turns)
    }
}
