//! Request marker protocol
//!
//! The model asks for external data by embedding fenced blocks tagged `mcp`
//! whose body is a JSON [`CapabilityRequest`]:
//!
//! ````text
//! Let me look that up.
//! ```mcp
//! {"type": "tool", "server": "SearchEngine", "name": "search", "params": {"query": "rust"}}
//! ```
//! ````
//!
//! [`extract_requests`] finds those blocks, [`wrap_in_marker`] renders one,
//! [`format_results_for_model`] turns a result bundle into the system turn fed
//! back to the model, and [`build_guidance_prompt`] renders the initial
//! system guidance.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::mcp::types::{CapabilityRequest, FulfillmentBundle, RequestKind, ServerCapabilities};

/// Fence opening a request block.
pub const MARKER_OPEN: &str = "```mcp";

/// Fence closing any block.
pub const MARKER_CLOSE: &str = "```";

/// Header line of the injected results turn.
pub const RESULTS_HEADER: &str = "Here are the results from the MCP requests:";

/// Closing instruction of the injected results turn.
pub const RESULTS_FOOTER: &str = "Use this information to formulate your response.";

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // One newline directly after the closing fence goes with the block.
    PATTERN.get_or_init(|| Regex::new(r"```mcp\s+([\s\S]*?)```\n?").expect("Invalid regex pattern"))
}

fn blank_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n\s*\n\s*\n").expect("Invalid regex pattern"))
}

/// Extract capability requests from model output.
///
/// Returns the text with every marker block removed, plus the valid
/// requests in the order they appear. Malformed or invalid blocks are
/// logged, skipped and still removed. When no valid request is found the
/// input is returned unchanged.
///
/// # Examples
///
/// ```
/// use mcphost::mcp::marker::extract_requests;
///
/// let text = "Check the weather.\n```mcp\n{\"type\":\"tool\",\"server\":\"Weather\",\"name\":\"lookup\",\"params\":{\"city\":\"Paris\"}}\n```\n";
/// let (cleaned, requests) = extract_requests(text);
/// assert_eq!(cleaned, "Check the weather.\n");
/// assert_eq!(requests[0].id(), "Weather_lookup");
/// ```
pub fn extract_requests(text: &str) -> (String, Vec<CapabilityRequest>) {
    let pattern = block_pattern();
    let mut requests = Vec::new();

    for captures in pattern.captures_iter(text) {
        let Some(body) = captures.get(1) else {
            continue;
        };
        let body = body.as_str().trim();
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Invalid JSON in MCP request: {}", e);
                continue;
            }
        };
        match CapabilityRequest::from_value(value) {
            Ok(request) => requests.push(request),
            Err(e) => tracing::warn!("Skipping MCP request: {}", e),
        }
    }

    if requests.is_empty() {
        return (text.to_string(), requests);
    }

    tracing::debug!(count = requests.len(), "Extracted MCP requests");
    let stripped = pattern.replace_all(text, "");
    let cleaned = blank_run_pattern().replace_all(&stripped, "\n\n").into_owned();
    (cleaned, requests)
}

/// Render a request as a marker block, newline-terminated.
pub fn wrap_in_marker(request: &CapabilityRequest) -> String {
    let body = serde_json::to_string_pretty(request).unwrap_or_else(|_| "{}".to_string());
    format!("{}\n{}\n{}\n", MARKER_OPEN, body, MARKER_CLOSE)
}

/// Render a result bundle as the system turn handed back to the model.
///
/// One `# <key>` section per entry, each holding the pretty-printed JSON
/// value, in bundle order.
pub fn format_results_for_model(bundle: &FulfillmentBundle) -> String {
    let mut formatted = format!("{}\n\n", RESULTS_HEADER);
    for (key, value) in bundle.iter() {
        let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        formatted.push_str(&format!("# {}\n```json\n{}\n```\n\n", key, rendered));
    }
    formatted.push_str(RESULTS_FOOTER);
    formatted
}

/// Render the system guidance prepended to a fresh conversation.
///
/// Lists every server with the resources and tools it advertised.
pub fn build_guidance_prompt(capabilities: &BTreeMap<String, ServerCapabilities>) -> String {
    let resource_example = CapabilityRequest::new(RequestKind::Resource, "WebScraper", "webpage")
        .with_params(params(json!({"url": "https://example.com"})));
    let tool_example = CapabilityRequest::new(RequestKind::Tool, "SearchEngine", "search")
        .with_params(params(json!({"query": "sample search query"})));

    let mut prompt = String::from(
        "You are an assistant with access to external tools and data sources via the \
         Model Context Protocol (MCP).\n\n\
         When you need to access external information or use a tool, you can use the MCP format:\n\n",
    );
    prompt.push_str(&wrap_in_marker(&resource_example));
    prompt.push_str("\nOr for tools:\n\n");
    prompt.push_str(&wrap_in_marker(&tool_example));
    prompt.push_str("\nYou may add an \"id\" field to name the result.\n\n");

    if capabilities.is_empty() {
        prompt.push_str("Available MCP servers: none\n");
    } else {
        prompt.push_str("Available MCP servers:\n");
        for (server, caps) in capabilities {
            prompt.push_str(&format!("- {}\n", server));
            prompt.push_str(&format!("  - Resources: {}\n", name_list(&caps.resources)));
            prompt.push_str(&format!("  - Tools: {}\n", name_list(&caps.tools)));
        }
    }

    prompt.push_str(
        "\nFirst try to answer from your knowledge. If you need external information, \
         use the appropriate MCP request.\n",
    );
    prompt
}

fn name_list(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
