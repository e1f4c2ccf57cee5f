use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use mcphost::error::{McpHostError, Result};
use mcphost::mcp::config::{McpServerConfig, TransportConfig};
use mcphost::providers::{Provider, Turn};

/// Provider that replays canned replies and records each history it saw
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, history: &[Turn]) -> Result<String> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| McpHostError::Provider("script exhausted".to_string()).into())
    }
}

/// Server entry that runs the pipe test server binary
#[allow(dead_code)]
pub fn pipe_server_config(name: &str) -> McpServerConfig {
    McpServerConfig {
        name: name.to_string(),
        transport: TransportConfig::Stdio {
            command: Some(env!("CARGO_BIN_EXE_pipe_test_server").to_string()),
            args: Vec::new(),
            env: HashMap::new(),
        },
        timeout_seconds: 10,
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
