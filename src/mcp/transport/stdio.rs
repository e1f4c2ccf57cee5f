//! Pipe transport for child-process capability servers
//!
//! [`StdioTransport`] launches the configured command and exchanges one
//! JSON object per line over the child's stdin/stdout:
//!
//! - Each request is written as a single JSON object followed by `\n`.
//! - The next non-empty stdout line is read as the response.
//! - The child's stderr is drained in the background and logged via
//!   `tracing::debug!`; it is never treated as an error.
//!
//! The protocol carries no request ids, so at most one request is in flight
//! per session. The session lives behind a mutex held for the whole
//! write-then-read exchange. After a timeout or I/O failure the stream may
//! be out of step with the requests, so the session refuses further
//! requests until it is closed.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::error::{McpHostError, Result};
use crate::mcp::config::TransportKind;
use crate::mcp::transport::Transport;
use crate::mcp::types::WireRequest;

/// How long `close` waits for the child to exit after SIGTERM.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Capability server reached through a child process's pipes.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use mcphost::mcp::transport::stdio::StdioTransport;
/// use mcphost::mcp::transport::Transport;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let transport = StdioTransport::new(
///     "Files".into(),
///     Some("./files-server".into()),
///     vec!["--root".into(), "/tmp".into()],
///     HashMap::new(),
///     Duration::from_secs(30),
/// );
/// transport.initialize().await?;
/// let tools = transport.list_tools().await;
/// transport.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StdioTransport {
    server_name: String,
    command: Option<String>,
    args: Vec<String>,
    env: HashMap<String, String>,
    timeout: Duration,
    session: Mutex<Option<PipeSession>>,
}

#[derive(Debug)]
struct PipeSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Set once a request failed mid-exchange.
    desynced: bool,
}

impl PipeSession {
    async fn exchange(&mut self, line: &str) -> Result<String> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        loop {
            match self.stdout.next_line().await? {
                Some(response) if response.trim().is_empty() => continue,
                Some(response) => return Ok(response),
                None => {
                    return Err(
                        McpHostError::Transport("server closed its output stream".into()).into(),
                    )
                }
            }
        }
    }
}

impl StdioTransport {
    /// Create an unconnected client. Nothing is spawned until
    /// [`Transport::initialize`].
    ///
    /// `env` is layered over the host's own environment.
    pub fn new(
        server_name: String,
        command: Option<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            server_name,
            command,
            args,
            env,
            timeout,
            session: Mutex::new(None),
        }
    }

    fn spawn(&self, command: &str) -> Result<PipeSession> {
        let mut cmd = Command::new(command);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            McpHostError::Transport(format!(
                "failed to spawn server `{}` for {}: {}",
                command, self.server_name, e
            ))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            McpHostError::Transport("child stdin unavailable after spawn".into())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpHostError::Transport("child stdout unavailable after spawn".into())
        })?;
        if let Some(stderr) = child.stderr.take() {
            let server = self.server_name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(
                        target: "mcphost::mcp::transport::stdio",
                        server = %server,
                        "server stderr: {}",
                        line
                    );
                }
            });
        }

        Ok(PipeSession {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            desynced: false,
        })
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    /// Launch the server process.
    ///
    /// # Errors
    ///
    /// Returns [`McpHostError::Config`] when no command is configured and
    /// [`McpHostError::Transport`] when the process cannot be spawned.
    async fn initialize(&self) -> Result<()> {
        let command = self.command.as_deref().filter(|c| !c.is_empty()).ok_or_else(|| {
            McpHostError::Config(format!("Command not specified for {}", self.server_name))
        })?;

        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        *guard = Some(self.spawn(command)?);
        tracing::info!(server = %self.server_name, command, "Started pipe server");
        Ok(())
    }

    async fn round_trip(&self, request: &WireRequest) -> Result<Value> {
        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| McpHostError::NotInitialized(self.server_name.clone()))?;
        if session.desynced {
            return Err(McpHostError::Transport(format!(
                "pipe session for {} is unusable after an earlier failure",
                self.server_name
            ))
            .into());
        }

        let mut line = serde_json::to_string(request)?;
        line.push('\n');

        // Stays set if the caller drops this future mid-exchange.
        session.desynced = true;
        let response = match tokio::time::timeout(self.timeout, session.exchange(&line)).await {
            Ok(Ok(response)) => {
                session.desynced = false;
                response
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(McpHostError::Timeout {
                    operation: format!("pipe request to {}", self.server_name),
                    seconds: self.timeout.as_secs(),
                }
                .into());
            }
        };

        serde_json::from_str(&response).map_err(|e| {
            McpHostError::Transport(format!("invalid JSON from {}: {}", self.server_name, e))
                .into()
        })
    }

    /// Terminate the server process and wait for it to exit.
    ///
    /// An already-exited process is not an error.
    async fn close(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        let Some(PipeSession {
            mut child, stdin, ..
        }) = session
        else {
            return Ok(());
        };
        drop(stdin);

        terminate(&mut child);
        match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(server = %self.server_name, %status, "Pipe server exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(server = %self.server_name, "Error waiting for pipe server: {}", e);
            }
            Err(_) => {
                tracing::warn!(server = %self.server_name, "Pipe server ignored SIGTERM, killing");
                let _ = child.kill().await;
            }
        }
        Ok(())
    }
}

/// Ask the child to exit. A process that is already gone is ignored.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: pid comes from a live tokio::process::Child handle.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }
}
