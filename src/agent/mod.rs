//! Agent module for mcphost
//!
//! This module contains conversation history management and the controller
//! that runs each user turn through the model and the MCP dispatcher.

pub mod conversation;
pub mod core;

pub use conversation::Conversation;
pub use core::{Agent, Exchange, ExchangePhase};
