//! End-to-end host tests
//!
//! Loads a YAML configuration naming the pipe test server, starts the host
//! with a scripted model and runs full exchanges through it.

mod common;

use std::sync::Arc;

use serial_test::serial;

use mcphost::cli::Cli;
use mcphost::config::Config;
use mcphost::mcp::marker::RESULTS_HEADER;
use mcphost::providers::{Role, Turn};
use mcphost::Host;

use common::{temp_config_file, ScriptedProvider};

fn config_yaml() -> String {
    format!(
        r#"
provider:
  type: ollama
  model: llama3.2:latest
mcp:
  servers:
    - name: Pipe
      transport:
        type: stdio
        command: "{}"
      timeout_seconds: 10
    - name: Remote
      transport:
        type: http
host:
  max_concurrent_requests: 2
  request_timeout_seconds: 5
"#,
        env!("CARGO_BIN_EXE_pipe_test_server")
    )
}

fn load_config() -> Config {
    for var in [
        "MCPHOST_PROVIDER",
        "MCPHOST_MODEL",
        "MCPHOST_API_BASE",
        "MCPHOST_API_KEY",
        "MCPHOST_MAX_CONCURRENT_REQUESTS",
    ] {
        std::env::remove_var(var);
    }
    let (_dir, path) = temp_config_file(&config_yaml());
    let config = Config::load(path.to_str().unwrap(), &Cli::default()).unwrap();
    config.validate().unwrap();
    config
}

#[tokio::test]
#[serial]
async fn test_host_starts_with_failed_sibling() {
    let config = load_config();
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let host = Host::start(&config, provider).await;

    let capabilities = host.capabilities();
    assert_eq!(capabilities.len(), 1);
    assert_eq!(capabilities["Pipe"].tools, ["echo", "fail", "slow", "exit"]);
    assert_eq!(capabilities["Pipe"].resources, ["greeting"]);

    let failures = &host.startup_report().failures;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "Remote");
    assert!(failures[0].error.contains("URL not specified for Remote"));

    assert!(host.guidance().contains("- Pipe"));
    assert!(!host.guidance().contains("- Remote"));

    host.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_two_pass_exchange_through_pipe_server() {
    let config = load_config();
    let first = "Let me check.\n```mcp\n{\"type\": \"tool\", \"server\": \"Pipe\", \"name\": \"echo\", \"params\": {\"message\": \"42 degrees\"}}\n```\n```mcp\n{\"type\": \"resource\", \"server\": \"Pipe\", \"name\": \"greeting://{name}\", \"params\": {\"name\": \"Ada\"}}\n```\n```mcp\n{\"type\": \"tool\", \"server\": \"Pipe\", \"name\": \"fail\", \"params\": {}}\n```\n";
    let provider = Arc::new(ScriptedProvider::new(&[first, "It is 42 degrees, Ada."]));
    let host = Host::start(&config, provider.clone()).await;

    let exchange = host
        .process_message("How warm is it?", Vec::new())
        .await
        .unwrap();
    assert_eq!(exchange.response, "It is 42 degrees, Ada.");

    let bundle = exchange.bundle.unwrap();
    let keys: Vec<&String> = bundle.keys().collect();
    assert_eq!(keys, ["Pipe_echo", "Pipe_greeting://{name}", "Pipe_fail"]);
    assert_eq!(bundle.get("Pipe_echo").unwrap()["text"], "42 degrees");
    assert_eq!(
        bundle.get("Pipe_greeting://{name}").unwrap()["content"],
        "Hello, Ada!"
    );
    assert_eq!(
        bundle.get("Pipe_fail").unwrap()["error"],
        "tool failed on purpose"
    );

    let roles: Vec<Role> = exchange.history.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        [Role::System, Role::User, Role::System, Role::Assistant]
    );
    let results_turn = &provider.seen()[1][2];
    assert!(results_turn.content.starts_with(RESULTS_HEADER));
    assert!(results_turn.content.contains("42 degrees"));

    host.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_history_carries_across_exchanges() {
    let config = load_config();
    let provider = Arc::new(ScriptedProvider::new(&["First answer", "Second answer"]));
    let host = Host::start(&config, provider.clone()).await;

    let first = host.process_message("one", Vec::new()).await.unwrap();
    let second = host
        .process_message("two", first.history.clone())
        .await
        .unwrap();

    assert_eq!(second.response, "Second answer");
    assert_eq!(second.history.len(), 5);
    assert_eq!(second.history[3], Turn::user("two"));
    assert_eq!(
        second
            .history
            .iter()
            .filter(|t| t.role == Role::System)
            .count(),
        1
    );

    host.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_model_failure_returns_no_history() {
    let config = load_config();
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let host = Host::start(&config, provider).await;

    let history = vec![Turn::user("earlier"), Turn::assistant("reply")];
    let result = host.process_message("next", history.clone()).await;
    assert!(result.is_err());
    assert_eq!(history.len(), 2);

    host.shutdown().await;
}
