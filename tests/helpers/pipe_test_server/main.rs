//! Pipe test server binary for integration tests
//!
//! Speaks the host's line protocol over stdin/stdout: one JSON request per
//! line in, one JSON response per line out. Used by integration tests to
//! exercise the stdio transport without a real capability server.
//!
//! # Handled Requests
//!
//! - `list_tools` -- `echo`, `fail`, `slow` and `exit`
//! - `list_resources` -- one templated resource, `greeting://{name}`
//! - tool `echo` -- returns `params.message` as text
//! - tool `fail` -- returns an `error` member
//! - tool `slow` -- sleeps `params.ms` milliseconds, then answers
//! - tool `exit` -- exits without answering
//! - resource `greeting://<name>` -- returns `Hello, <name>!`
//! - anything else, or a line that is not JSON -- returns an `error` member

use std::io::{self, BufRead, Write};
use std::time::Duration;

use serde_json::{json, Value};

fn main() {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    eprintln!("pipe_test_server ready");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(request) => match handle(&request) {
                Some(response) => response,
                None => std::process::exit(3),
            },
            Err(e) => json!({"error": format!("Parse error: {}", e)}),
        };

        let _ = writeln!(out, "{}", response);
        let _ = out.flush();
    }
}

fn handle(request: &Value) -> Option<Value> {
    let kind = request.get("type").and_then(Value::as_str).unwrap_or("");
    let name = request.get("name").and_then(Value::as_str).unwrap_or("");
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

    let response = match (kind, name) {
        ("list_tools", _) => json!({"tools": [
            {
                "name": "echo",
                "description": "Echo a message back",
                "inputSchema": {
                    "type": "object",
                    "properties": {"message": {"type": "string", "description": "Text to echo"}},
                    "required": ["message"]
                }
            },
            {"name": "fail", "description": "Always fails"},
            {"name": "slow", "description": "Answers after a delay", "parameters": [{"name": "ms", "required": false}]},
            {"name": "exit", "description": "Exits without answering"}
        ]}),
        ("list_resources", _) => json!([
            {"name": "greeting", "description": "A greeting", "uriTemplate": "greeting://{name}"}
        ]),
        ("tool", "echo") => {
            let message = params.get("message").and_then(Value::as_str).unwrap_or("");
            json!({"text": message, "mime_type": "text/plain"})
        }
        ("tool", "fail") => json!({"error": {"message": "tool failed on purpose"}}),
        ("tool", "slow") => {
            let ms = params.get("ms").and_then(Value::as_u64).unwrap_or(100);
            std::thread::sleep(Duration::from_millis(ms));
            json!({"text": format!("slept {}ms", ms)})
        }
        ("tool", "exit") => return None,
        ("resource", uri) if uri.starts_with("greeting://") => {
            let who = &uri["greeting://".len()..];
            json!({"content": format!("Hello, {}!", who), "mimeType": "text/plain"})
        }
        _ => json!({"error": format!("Unknown request: {} {}", kind, name)}),
    };
    Some(response)
}
