//! Special commands for interactive chat
//!
//! Lines starting with `/` control the session instead of being sent to the
//! model. `exit` and `quit` also work without the slash. Commands are
//! case-insensitive.

use thiserror::Error;

/// Errors from parsing a special command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),
}

/// Session commands available during chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Drop the conversation history; the next message starts fresh
    Reset,
    /// Show connected servers and their capabilities
    Servers,
    /// Show the guidance prompt sent to the model
    Guidance,
    /// Show available commands
    Help,
    /// Leave the session
    Exit,
    /// Not a command; send the line to the model
    None,
}

/// Parse one line of chat input
///
/// # Examples
///
/// ```
/// use mcphost::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/reset").unwrap(), SpecialCommand::Reset);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/nope").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/reset" | "/clear" => Ok(SpecialCommand::Reset),
        "/servers" => Ok(SpecialCommand::Servers),
        "/guidance" => Ok(SpecialCommand::Guidance),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print the chat command reference
pub fn print_help() {
    println!(
        r#"
Chat Commands
=============

  /reset, /clear  - Forget the conversation and start fresh
  /servers        - List connected MCP servers and their capabilities
  /guidance       - Show the system guidance sent to the model
  /help, /?       - Show this help
  /exit, /quit    - Leave the session (also: exit, quit, Ctrl-D)

Anything else is sent to the model. When the model asks for MCP resources or
tools, mcphost fulfills the requests and the model answers with the results.
"#
    );
}
