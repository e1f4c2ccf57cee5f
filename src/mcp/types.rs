//! Capability request, response and listing types
//!
//! These are the shapes exchanged between the marker protocol, the
//! dispatcher and the transport clients:
//!
//! - [`CapabilityRequest`] -- what the model embeds in its text
//! - [`WireRequest`] -- what a transport sends to a capability server
//! - [`InvokeOutcome`] -- the normalized result of one invocation
//! - [`ToolInfo`] / [`ResourceInfo`] -- capability discovery metadata
//! - [`FulfillmentBundle`] -- the ordered id to result mapping handed back to
//!   the conversation loop

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{McpHostError, Result};

/// Default MIME type used when a server does not report one.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Kind of capability being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// A named, parameterized read
    Resource,
    /// A named, parameterized action
    Tool,
}

impl RequestKind {
    /// Parse the marker `type` field.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "resource" => Some(Self::Resource),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    /// The wire spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability request embedded by the model in its output.
///
/// `id` is optional on the wire; [`CapabilityRequest::id`] supplies the
/// `"{server}_{name}"` default so that a parsed request compares equal to
/// the request it was rendered from.
///
/// # Examples
///
/// ```
/// use mcphost::mcp::types::{CapabilityRequest, RequestKind};
///
/// let request = CapabilityRequest::new(RequestKind::Tool, "SearchEngine", "search");
/// assert_eq!(request.id(), "SearchEngine_search");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    /// Resource read or tool call
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// Name of the registered capability server
    pub server: String,
    /// Resource or tool name on that server
    pub name: String,
    /// Arguments for the resource or tool
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Caller-chosen key for the result bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CapabilityRequest {
    /// Create a request with empty params and no explicit id.
    pub fn new(kind: RequestKind, server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            server: server.into(),
            name: name.into(),
            params: Map::new(),
            id: None,
        }
    }

    /// Attach params to the request.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Attach an explicit id to the request.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Bundle key for a successful result: the explicit id or
    /// `"{server}_{name}"`.
    pub fn id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}_{}", self.server, self.name),
        }
    }

    /// Bundle key used when dispatching this request raised an error.
    pub fn error_key(&self) -> String {
        format!("{}_{}_error", self.server, self.name)
    }

    /// Validate and convert a parsed marker body.
    ///
    /// # Errors
    ///
    /// Returns [`McpHostError::Protocol`] when the body is not an object,
    /// when `type`, `server` or `name` is missing or empty, when `type` is not
    /// `resource` or `tool`, or when `params`/`id` have the wrong JSON type.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(McpHostError::Protocol("request body is not a JSON object".into()).into());
        };

        let kind_field = required_string(&object, "type")?;
        let kind = RequestKind::parse(&kind_field).ok_or_else(|| {
            McpHostError::Protocol(format!("invalid request type '{}'", kind_field))
        })?;
        let server = required_string(&object, "server")?;
        let name = required_string(&object, "name")?;

        let params = match object.remove("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params,
            Some(_) => {
                return Err(McpHostError::Protocol("'params' must be a JSON object".into()).into())
            }
        };

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            Some(_) => {
                return Err(McpHostError::Protocol("'id' must be a non-empty string".into()).into())
            }
        };

        Ok(Self {
            kind,
            server,
            name,
            params,
            id,
        })
    }
}

fn required_string(object: &Map<String, Value>, field: &str) -> Result<String> {
    match object.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => {
            Err(McpHostError::Protocol(format!("required field '{}' is empty", field)).into())
        }
        Some(_) => {
            Err(McpHostError::Protocol(format!("required field '{}' is not a string", field)).into())
        }
        None => Err(McpHostError::Protocol(format!("missing required field '{}'", field)).into()),
    }
}

/// Operation carried by a [`WireRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireOperation {
    /// Read a resource
    Resource,
    /// Call a tool
    Tool,
    /// Enumerate tools
    ListTools,
    /// Enumerate resources
    ListResources,
}

impl From<RequestKind> for WireOperation {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Resource => Self::Resource,
            RequestKind::Tool => Self::Tool,
        }
    }
}

/// One host-to-server request.
///
/// Serialized as a single JSON object: a line on the pipe transport, a POST
/// body on the HTTP and event-stream transports. No request id is carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    /// What the server should do
    #[serde(rename = "type")]
    pub operation: WireOperation,
    /// Resource or tool name (absent for listings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl WireRequest {
    /// Build an invocation request.
    ///
    /// Resource names may be URI templates such as `users://{user_id}`;
    /// placeholders are filled from `params` before sending.
    pub fn invoke(kind: RequestKind, name: &str, params: &Map<String, Value>) -> Self {
        let name = match kind {
            RequestKind::Resource => expand_uri_template(name, params),
            RequestKind::Tool => name.to_string(),
        };
        Self {
            operation: kind.into(),
            name: Some(name),
            params: params.clone(),
        }
    }

    /// Build a `list_tools` request.
    pub fn list_tools() -> Self {
        Self {
            operation: WireOperation::ListTools,
            name: None,
            params: Map::new(),
        }
    }

    /// Build a `list_resources` request.
    pub fn list_resources() -> Self {
        Self {
            operation: WireOperation::ListResources,
            name: None,
            params: Map::new(),
        }
    }
}

/// Replace `{key}` placeholders in a resource name with param values.
///
/// # Examples
///
/// ```
/// use mcphost::mcp::types::expand_uri_template;
///
/// let mut params = serde_json::Map::new();
/// params.insert("user_id".into(), serde_json::json!(42));
/// assert_eq!(expand_uri_template("users://{user_id}", &params), "users://42");
/// ```
pub fn expand_uri_template(template: &str, params: &Map<String, Value>) -> String {
    let mut uri = template.to_string();
    for (key, value) in params {
        let placeholder = format!("{{{}}}", key);
        if uri.contains(&placeholder) {
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            uri = uri.replace(&placeholder, &replacement);
        }
    }
    uri
}

/// Normalized result of a single invocation.
///
/// Serializes untagged, so the bundle sees exactly `{content, mime_type}`,
/// `{text, mime_type}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvokeOutcome {
    /// Resource contents
    Resource {
        /// Raw content returned by the server
        content: Value,
        /// Reported MIME type
        mime_type: String,
    },
    /// Tool output
    Tool {
        /// Text returned by the tool
        text: String,
        /// Reported MIME type
        mime_type: String,
    },
    /// Backend failure degraded into a result
    Error {
        /// Description of the failure
        error: String,
    },
}

impl InvokeOutcome {
    /// Build an error-shaped outcome.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Whether this outcome carries a backend error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Normalize a raw server response for the given request kind.
    ///
    /// An `error` member always wins. Resource responses use `content` (or
    /// the whole object) and tool responses use `text` (or `content`, or the
    /// serialized response). `mime_type` or `mimeType` is honored, defaulting
    /// to [`DEFAULT_MIME_TYPE`].
    pub fn from_response(kind: RequestKind, response: Value) -> Self {
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let message = match error {
                Value::String(s) => s.clone(),
                Value::Object(obj) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string()),
                other => other.to_string(),
            };
            return Self::error(message);
        }

        let mime_type = response
            .get("mime_type")
            .or_else(|| response.get("mimeType"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        match kind {
            RequestKind::Resource => {
                let content = match response.get("content") {
                    Some(content) => content.clone(),
                    None => response,
                };
                Self::Resource { content, mime_type }
            }
            RequestKind::Tool => {
                let text = match response.get("text").or_else(|| response.get("content")) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => response.to_string(),
                };
                Self::Tool { text, mime_type }
            }
        }
    }
}

/// Description of one tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the tool requires the parameter
    #[serde(default)]
    pub required: bool,
}

/// Tool metadata returned by `list_tools`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Declared parameters
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
}

impl ToolInfo {
    /// Parse one listing entry.
    ///
    /// Accepts either an explicit `parameters` array or a JSON-schema style
    /// `inputSchema` whose `properties` and `required` members describe the
    /// parameters.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut info: ToolInfo = serde_json::from_value(value.clone())?;
        if info.parameters.is_empty() {
            if let Some(schema) = value.get("inputSchema").or_else(|| value.get("input_schema")) {
                info.parameters = parameters_from_schema(schema);
            }
        }
        Ok(info)
    }
}

fn parameters_from_schema(schema: &Value) -> Vec<ParameterInfo> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| ParameterInfo {
                    name: name.clone(),
                    description: property
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Resource metadata returned by `list_resources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Resource name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// URI template the name expands into, if any
    #[serde(default, alias = "uriTemplate")]
    pub uri_template: Option<String>,
}

/// Names of the capabilities one server advertised at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Resource names
    pub resources: Vec<String>,
    /// Tool names
    pub tools: Vec<String>,
}

/// Pull the entry array out of a listing response.
///
/// Servers may answer with a bare array or with an object holding the array
/// under `key` (`tools` or `resources`).
pub fn listing_entries(response: &Value, key: &str) -> Result<Vec<Value>> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return Err(McpHostError::Transport(format!("server returned error: {}", error)).into());
    }
    match response {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(object) => match object.get(key) {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(McpHostError::Transport(format!("listing response has no '{}' array", key))
                .into()),
        },
        _ => Err(McpHostError::Transport("listing response is not an array or object".into())
            .into()),
    }
}

/// Ordered mapping from request id (or error key) to result.
///
/// Values are either a serialized [`InvokeOutcome`] or a plain error string.
/// Iteration order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FulfillmentBundle(Map<String, Value>);

impl FulfillmentBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert an entry, returning any value previously stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether an entry exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bundle has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consume the bundle into its underlying JSON map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
