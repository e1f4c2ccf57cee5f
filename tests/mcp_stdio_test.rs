//! Pipe transport integration tests
//!
//! Runs the `pipe_test_server` helper binary as a child process and talks to
//! it through the stdio transport, the registry and the dispatcher.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use mcphost::mcp::dispatcher::Dispatcher;
use mcphost::mcp::registry::ServerRegistry;
use mcphost::mcp::transport::stdio::StdioTransport;
use mcphost::mcp::transport::Transport;
use mcphost::mcp::types::{CapabilityRequest, InvokeOutcome, RequestKind};
use mcphost::McpHostError;

use common::pipe_server_config;

fn transport() -> StdioTransport {
    StdioTransport::new(
        "Pipe".to_string(),
        Some(env!("CARGO_BIN_EXE_pipe_test_server").to_string()),
        Vec::new(),
        HashMap::new(),
        Duration::from_secs(10),
    )
}

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_listing_discovers_tools_and_resources() {
    let transport = transport();
    transport.initialize().await.unwrap();

    let tools = transport.list_tools().await;
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["echo", "fail", "slow", "exit"]);
    assert_eq!(tools[0].parameters[0].name, "message");
    assert!(tools[0].parameters[0].required);

    let resources = transport.list_resources().await;
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri_template.as_deref(), Some("greeting://{name}"));

    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_invoke_tool_and_resource() {
    let transport = transport();
    transport.initialize().await.unwrap();

    let echoed = transport
        .invoke(RequestKind::Tool, "echo", &params(json!({"message": "ping"})))
        .await
        .unwrap();
    assert_eq!(
        echoed,
        InvokeOutcome::Tool {
            text: "ping".to_string(),
            mime_type: "text/plain".to_string()
        }
    );

    let greeting = transport
        .invoke(
            RequestKind::Resource,
            "greeting://{name}",
            &params(json!({"name": "Ada"})),
        )
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&greeting).unwrap(),
        json!({"content": "Hello, Ada!", "mime_type": "text/plain"})
    );

    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_backend_error_becomes_error_result() {
    let transport = transport();
    transport.initialize().await.unwrap();

    let outcome = transport
        .invoke(RequestKind::Tool, "fail", &Map::new())
        .await
        .unwrap();
    assert_eq!(outcome, InvokeOutcome::error("tool failed on purpose"));

    let unknown = transport
        .invoke(RequestKind::Tool, "nope", &Map::new())
        .await
        .unwrap();
    assert!(unknown.is_error());

    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_child_exit_degrades_to_error_results() {
    let transport = transport();
    transport.initialize().await.unwrap();

    let outcome = transport
        .invoke(RequestKind::Tool, "exit", &Map::new())
        .await
        .unwrap();
    assert!(outcome.is_error());

    let after = transport
        .invoke(RequestKind::Tool, "echo", &params(json!({"message": "x"})))
        .await
        .unwrap();
    assert!(after.is_error());

    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_invoke_before_initialize_is_an_error() {
    let transport = transport();
    let err = transport
        .invoke(RequestKind::Tool, "echo", &Map::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<McpHostError>(),
        Some(McpHostError::NotInitialized(_))
    ));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let transport = transport();
    transport.initialize().await.unwrap();
    transport.close().await.unwrap();
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_dispatch_to_one_pipe_server() {
    let (registry, failures) = ServerRegistry::connect(&[pipe_server_config("Pipe")]).await;
    assert!(failures.is_empty());
    let registry = Arc::new(registry);
    let dispatcher = Dispatcher::new(Arc::clone(&registry)).with_max_concurrent(4);

    let requests: Vec<CapabilityRequest> = (0..4)
        .map(|i| {
            CapabilityRequest::new(RequestKind::Tool, "Pipe", "echo")
                .with_params(params(json!({"message": format!("m{}", i)})))
                .with_id(format!("echo_{}", i))
        })
        .collect();

    let bundle = dispatcher.fulfill(&requests).await;
    assert_eq!(bundle.len(), 4);
    for i in 0..4 {
        let key = format!("echo_{}", i);
        assert_eq!(bundle.get(&key).unwrap()["text"], format!("m{}", i));
    }

    registry.close_all().await;
}

#[tokio::test]
async fn test_request_timeout_on_slow_pipe_request() {
    let (registry, _) = ServerRegistry::connect(&[pipe_server_config("Pipe")]).await;
    let registry = Arc::new(registry);
    let dispatcher = Dispatcher::new(Arc::clone(&registry))
        .with_request_timeout(Some(Duration::from_millis(200)));

    let started = Instant::now();
    let bundle = dispatcher
        .fulfill(&[CapabilityRequest::new(RequestKind::Tool, "Pipe", "slow")
            .with_params(params(json!({"ms": 2000})))])
        .await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(bundle
        .get("Pipe_slow_error")
        .and_then(Value::as_str)
        .unwrap()
        .contains("Timed out"));

    // The abandoned response would answer the next request, so the session
    // refuses further work.
    let after = dispatcher
        .fulfill(&[CapabilityRequest::new(RequestKind::Tool, "Pipe", "echo")
            .with_params(params(json!({"message": "late"})))])
        .await;
    assert!(after.get("Pipe_echo").unwrap()["error"]
        .as_str()
        .unwrap()
        .contains("unusable"));

    registry.close_all().await;
}

#[tokio::test]
async fn test_missing_command_fails_only_that_server() {
    let mut broken = pipe_server_config("Broken");
    broken.transport = mcphost::mcp::config::TransportConfig::Stdio {
        command: None,
        args: Vec::new(),
        env: HashMap::new(),
    };

    let (registry, failures) =
        ServerRegistry::connect(&[broken, pipe_server_config("Pipe")]).await;
    assert!(registry.contains("Pipe"));
    assert!(!registry.contains("Broken"));
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.contains("Command not specified for Broken"));

    registry.close_all().await;
}
