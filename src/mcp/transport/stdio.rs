use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{timeout, Duration};

use super::{classify, reply_to, Incoming, Transport};
use crate::error::{RelayError, Result};
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Newline-delimited JSON-RPC over a child process's stdin and stdout.
pub struct StdioTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl StdioTransport {
    pub fn spawn(command: &str, args: &[String], verbose: bool) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if verbose { Stdio::inherit() } else { Stdio::null() })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            RelayError::Transport(format!("failed to start '{}': {}", command, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RelayError::Transport("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::Transport("child stdout unavailable".to_string()))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    async fn write_message<M: Serialize>(&mut self, message: &M) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RelayError::Transport("connection already closed".to_string()))?;
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.write_message(request).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self.stdout.read_line(&mut line).await?;
            if read == 0 {
                return Err(RelayError::Transport(format!(
                    "server closed its output while '{}' was pending",
                    request.method
                )));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!("ignoring non-JSON output from server: {}", trimmed);
                    continue;
                }
            };

            match classify(value)? {
                Incoming::Response(response) if response.has_id(request.id) => return Ok(response),
                Incoming::Response(response) => {
                    tracing::debug!(id = ?response.id, "skipping response for another request");
                }
                Incoming::ServerMessage { method, id } => match reply_to(&method, id) {
                    Some(reply) => {
                        tracing::debug!(%method, "answering server request");
                        self.write_message(&reply).await?;
                    }
                    None => tracing::debug!(%method, "skipping server notification"),
                },
            }
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        self.write_message(notification).await
    }

    async fn close(&mut self) -> Result<()> {
        // Closing stdin asks the server to exit.
        drop(self.stdin.take());

        match timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(%status, "server exited");
            }
            Err(_) => {
                tracing::debug!("server did not exit, killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}
