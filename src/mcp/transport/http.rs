//! HTTP transport with optional credential exchange
//!
//! [`HttpTransport`] POSTs each [`WireRequest`] as a JSON body to the
//! configured URL. When client credentials are configured, `initialize`
//! first exchanges them for a bearer token:
//!
//! ```text
//! POST {url without trailing /mcp}/api/auth/token
//!      {"clientId": "...", "apiKey": "..."}
//! 200  {"token": "..."}
//! ```
//!
//! Any other status keeps the server out of the registry.
//!
//! Responses may be `application/json` or `text/event-stream`; in the
//! latter case the first non-ping `data:` event carries the answer. The
//! POST and event-stream helpers here are shared with
//! [`crate::mcp::transport::sse`].

use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use url::Url;

use crate::error::{McpHostError, Result};
use crate::mcp::config::{AuthConfig, TransportKind};
use crate::mcp::transport::Transport;
use crate::mcp::types::WireRequest;

/// Path appended to the server root for the credential exchange.
pub const AUTH_TOKEN_PATH: &str = "/api/auth/token";

/// Capability server reached over plain HTTP.
#[derive(Debug)]
pub struct HttpTransport {
    server_name: String,
    url: Option<String>,
    auth: Option<AuthConfig>,
    timeout: Duration,
    session: RwLock<Option<HttpSession>>,
}

/// An open HTTP client bound to one endpoint.
#[derive(Debug, Clone)]
pub(crate) struct HttpSession {
    client: reqwest::Client,
    endpoint: Url,
    bearer: Option<String>,
}

impl HttpSession {
    /// Build a session for `url`.
    pub(crate) fn open(server_name: &str, url: Option<&str>, timeout: Duration) -> Result<Self> {
        let url = url.filter(|u| !u.is_empty()).ok_or_else(|| {
            McpHostError::Config(format!("URL not specified for {}", server_name))
        })?;
        let endpoint = Url::parse(url).map_err(|e| {
            McpHostError::Config(format!("Invalid URL '{}' for {}: {}", url, server_name, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpHostError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            bearer: None,
        })
    }

    /// POST one request and decode the answer.
    pub(crate) async fn post(&self, request: &WireRequest) -> Result<Value> {
        let mut req = self
            .client
            .post(self.endpoint.as_str())
            .header("Accept", "application/json, text/event-stream")
            .json(request);
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            McpHostError::Transport(format!("HTTP POST to {} failed: {}", self.endpoint, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpHostError::Transport(format!(
                "HTTP POST returned status {}: {}",
                status, body
            ))
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = if content_type.contains("text/event-stream") {
            first_sse_payload(response.bytes_stream())
                .await
                .ok_or_else(|| {
                    McpHostError::Transport("event stream ended without a data event".into())
                })?
        } else {
            response.text().await.map_err(|e| {
                McpHostError::Transport(format!("failed to read response body: {}", e))
            })?
        };

        serde_json::from_str(&body).map_err(|e| {
            McpHostError::Transport(format!("invalid JSON in response: {}", e)).into()
        })
    }
}

impl HttpTransport {
    /// Create an unconnected client.
    pub fn new(
        server_name: String,
        url: Option<String>,
        auth: Option<AuthConfig>,
        timeout: Duration,
    ) -> Self {
        Self {
            server_name,
            url,
            auth,
            timeout,
            session: RwLock::new(None),
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    /// Open the HTTP client and, if credentials are configured, exchange
    /// them for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`McpHostError::Config`] for a missing or invalid URL and for
    /// any failed credential exchange.
    async fn initialize(&self) -> Result<()> {
        let mut session = HttpSession::open(&self.server_name, self.url.as_deref(), self.timeout)?;

        if let Some((client_id, api_key)) = self.auth.as_ref().and_then(AuthConfig::credentials) {
            let token =
                exchange_credentials(&session.client, session.endpoint.as_str(), client_id, api_key)
                    .await
                    .map_err(|e| {
                        McpHostError::Config(format!(
                            "Authentication failed for {}: {}",
                            self.server_name, e
                        ))
                    })?;
            session.bearer = Some(token);
            tracing::debug!(server = %self.server_name, "Obtained bearer token");
        }

        *self.session.write().await = Some(session);
        Ok(())
    }

    async fn round_trip(&self, request: &WireRequest) -> Result<Value> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| McpHostError::NotInitialized(self.server_name.clone()))?;
        session.post(request).await
    }

    async fn close(&self) -> Result<()> {
        self.session.write().await.take();
        Ok(())
    }
}

/// Derive the credential exchange URL from a server URL.
///
/// A trailing `/mcp` path segment is stripped before appending
/// [`AUTH_TOKEN_PATH`].
///
/// # Examples
///
/// ```
/// use mcphost::mcp::transport::http::auth_endpoint;
///
/// assert_eq!(
///     auth_endpoint("http://localhost:3000/mcp"),
///     "http://localhost:3000/api/auth/token"
/// );
/// ```
pub fn auth_endpoint(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let root = trimmed.strip_suffix("/mcp").unwrap_or(trimmed);
    format!("{}{}", root, AUTH_TOKEN_PATH)
}

async fn exchange_credentials(
    client: &reqwest::Client,
    url: &str,
    client_id: &str,
    api_key: &str,
) -> Result<String> {
    let response = client
        .post(auth_endpoint(url))
        .json(&json!({"clientId": client_id, "apiKey": api_key}))
        .send()
        .await?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(
            McpHostError::Authentication(format!("HTTP {} - {}", status.as_u16(), body)).into(),
        );
    }

    let body: Value = response.json().await?;
    body.get("token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            McpHostError::Authentication("token missing from auth response".into()).into()
        })
}

// ---------------------------------------------------------------------------
// Event-stream parsing
// ---------------------------------------------------------------------------

/// Read an event-stream body until the first data-bearing event.
///
/// `event: ping` events and `[PING]` data are skipped. Returns `None` if the
/// stream ends (or fails) before any data arrives.
///
/// Bytes are buffered until a blank line completes an event, so a UTF-8
/// sequence split across chunks is decoded whole.
pub async fn first_sse_payload(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
) -> Option<String> {
    use futures::StreamExt;

    let mut buffer: Vec<u8> = Vec::new();
    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(_) => break,
        };
        // CR never occurs inside a multibyte sequence.
        buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        while let Some(pos) = buffer.windows(2).position(|w| w == b"\n\n") {
            let event_block: Vec<u8> = buffer.drain(..pos + 2).collect();
            if let Some(data) = parse_sse_event(&String::from_utf8_lossy(&event_block[..pos])) {
                return Some(data);
            }
        }
    }

    parse_sse_event(&String::from_utf8_lossy(&buffer))
}

/// Extract the data of one event block, or `None` for pings and
/// data-less blocks.
pub fn parse_sse_event(event_block: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event_type: Option<&str> = None;

    for line in event_block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        }
        // id:, retry: and `:` comments carry nothing we need.
    }

    if event_type.is_some_and(|et| et.eq_ignore_ascii_case("ping")) {
        return None;
    }

    let data = data_lines.join("\n");
    if data.is_empty() || data.eq_ignore_ascii_case("[ping]") {
        return None;
    }
    Some(data)
}
