/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `ask`     -- One exchange with the model, answer printed to stdout
- `chat`    -- Interactive session that keeps history between turns
- `servers` -- Connect every configured server and report what it offers

Each handler builds what it needs from the configuration, runs, and closes
the server connections before returning.
*/

use crate::config::Config;
use crate::error::Result;
use crate::host::Host;
use crate::mcp::registry::{ServerFailure, ServerRegistry};
use crate::providers::create_provider;

use colored::Colorize;

// Special commands parser for chat sessions
pub mod special_commands;

/// Create the provider and connect every configured server
async fn start_host(config: &Config) -> Result<Host> {
    let provider = create_provider(&config.provider)?;
    let host = Host::start(config, provider).await;
    for failure in &host.startup_report().failures {
        eprintln!("{}", format_failure(failure).yellow());
    }
    Ok(host)
}

fn format_failure(failure: &ServerFailure) -> String {
    format!("Warning: server '{}' unavailable: {}", failure.name, failure.error)
}

// Single question handler
pub mod ask {
    //! One-shot question handler.
    //!
    //! Runs a single exchange against a fresh conversation and prints the
    //! model's final answer.

    use super::*;

    /// Ask one question and print the answer
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `message` - The user's question
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be created or the exchange fails
    pub async fn run_ask(config: Config, message: String) -> Result<()> {
        tracing::info!("Running single exchange");
        let host = start_host(&config).await?;

        let result = host.process_message(&message, Vec::new()).await;
        host.shutdown().await;

        let exchange = result?;
        println!("{}", exchange.response.trim_end());
        Ok(())
    }
}

// Interactive chat handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Keeps the conversation history between turns. A failed exchange leaves
    //! the history as it was before the message.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::providers::Turn;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider or the line editor cannot be created
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");
        let host = start_host(&config).await?;
        let mut rl = DefaultEditor::new()?;
        let mut history: Vec<Turn> = Vec::new();

        print_welcome_banner(&host);

        loop {
            let prompt = format!("{} ", "mcphost>".cyan().bold());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::Reset) => {
                            history.clear();
                            println!("{}\n", "Conversation cleared.".green());
                            continue;
                        }
                        Ok(SpecialCommand::Servers) => {
                            println!("{}", servers::format_servers(host.registry(), &[]));
                            continue;
                        }
                        Ok(SpecialCommand::Guidance) => {
                            println!("\n{}\n", host.guidance());
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    }

                    match host.process_message(trimmed, history.clone()).await {
                        Ok(exchange) => {
                            if let Some(bundle) = &exchange.bundle {
                                println!(
                                    "{}",
                                    format!("Fulfilled {} MCP request(s)", bundle.len()).cyan()
                                );
                            }
                            println!("\n{}\n", exchange.response.trim_end());
                            history = exchange.history;
                        }
                        Err(e) => {
                            eprintln!("{}\n", format!("Error: {}", e).red());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        host.shutdown().await;
        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome_banner(host: &Host) {
        println!("\n{}", "mcphost interactive chat".bold());
        println!(
            "Connected servers: {}",
            host.registry().len().to_string().green()
        );
        println!("Type '/help' for available commands, '/exit' to quit\n");
    }
}

// Server inspection handler
pub mod servers {
    //! Capability server inspection.

    use super::*;
    use serde_json::json;

    /// Connect every configured server and print what it advertises
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `as_json` - Print one JSON document instead of colored text
    ///
    /// # Errors
    ///
    /// Returns error if the JSON report cannot be serialized
    pub async fn run_servers(config: Config, as_json: bool) -> Result<()> {
        let (registry, failures) = ServerRegistry::connect(&config.mcp.servers).await;

        let output = if as_json {
            serde_json::to_string_pretty(&servers_json(&registry, &failures))?
        } else {
            format_servers(&registry, &failures)
        };
        registry.close_all().await;

        println!("{}", output);
        Ok(())
    }

    /// Machine-readable server report
    pub fn servers_json(registry: &ServerRegistry, failures: &[ServerFailure]) -> serde_json::Value {
        let servers: Vec<serde_json::Value> = registry
            .servers()
            .map(|server| {
                json!({
                    "name": server.name,
                    "transport": server.kind().to_string(),
                    "resources": server.resources,
                    "tools": server.tools,
                })
            })
            .collect();
        json!({ "servers": servers, "failures": failures })
    }

    /// Human-readable server report
    pub fn format_servers(registry: &ServerRegistry, failures: &[ServerFailure]) -> String {
        let mut out = String::new();
        if registry.is_empty() {
            out.push_str(&format!("{}\n", "No MCP servers connected".yellow()));
        }

        for server in registry.servers() {
            out.push_str(&format!(
                "{} ({})\n",
                server.name.bold().green(),
                server.kind()
            ));
            if server.resources.is_empty() && server.tools.is_empty() {
                out.push_str("  (no capabilities advertised)\n");
            }
            for resource in &server.resources {
                out.push_str(&format!("  {} {}", "resource".cyan(), resource.name));
                if let Some(description) = &resource.description {
                    out.push_str(&format!(" - {}", description));
                }
                out.push('\n');
            }
            for tool in &server.tools {
                out.push_str(&format!("  {} {}", "tool".magenta(), tool.name));
                if let Some(description) = &tool.description {
                    out.push_str(&format!(" - {}", description));
                }
                out.push('\n');
                for parameter in &tool.parameters {
                    let marker = if parameter.required { "*" } else { "" };
                    out.push_str(&format!("      {}{}\n", parameter.name, marker));
                }
            }
        }

        for failure in failures {
            out.push_str(&format!("{}\n", format_failure(failure).red()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::servers::{format_servers, servers_json};
    use super::*;
    use crate::mcp::transport::fake::FakeTransport;
    use crate::test_utils::registry_with;
    use serde_json::json;

    async fn registry() -> std::sync::Arc<ServerRegistry> {
        let fake = FakeTransport::new("Weather")
            .with_tools(json!({"tools": [{
                "name": "forecast",
                "description": "Daily forecast",
                "parameters": [{"name": "city", "required": true}]
            }]}))
            .with_resources(json!([{"name": "current", "description": "Right now"}]));
        registry_with(vec![fake]).await
    }

    #[tokio::test]
    async fn test_format_servers_lists_capabilities() {
        let registry = registry().await;
        let failures = vec![ServerFailure {
            name: "Broken".to_string(),
            error: "Command not specified for Broken".to_string(),
        }];

        let text = format_servers(&registry, &failures);
        assert!(text.contains("Weather"));
        assert!(text.contains("forecast - Daily forecast"));
        assert!(text.contains("current - Right now"));
        assert!(text.contains("city*"));
        assert!(text.contains("server 'Broken' unavailable"));
    }

    #[tokio::test]
    async fn test_format_servers_empty_registry() {
        let registry = registry_with(vec![]).await;
        let text = format_servers(&registry, &[]);
        assert!(text.contains("No MCP servers connected"));
    }

    #[tokio::test]
    async fn test_servers_json_shape() {
        let registry = registry().await;
        let report = servers_json(&registry, &[]);
        assert_eq!(report["servers"][0]["name"], "Weather");
        assert_eq!(report["servers"][0]["transport"], "stdio");
        assert_eq!(report["servers"][0]["tools"][0]["name"], "forecast");
        assert_eq!(report["failures"], json!([]));
    }
}
