use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use super::{McpTransport, TransportError};
use crate::adapter::AdapterConfig;
use crate::protocol::{classify_incoming, Incoming, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Maximum number of non-JSON lines to skip before declaring the server broken.
const MAX_SKIP_LINES: usize = 1000;

/// How long `close` waits for the child after closing its stdin.
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Stdio transport: communicates with a child process over stdin/stdout.
///
/// Each JSON-RPC message is a single newline-delimited line.
/// The `request_lock` serializes entire request/response cycles to prevent
/// response mismatching when multiple callers use the same server.
///
/// Lines are read with [`Lines::next_line`], which is cancel safe: a caller
/// whose context expires mid-read drops the future without losing a
/// partially buffered line. A late response to an abandoned request is
/// skipped by id on the next exchange.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<Lines<BufReader<ChildStdout>>>,
    child: Mutex<Child>,
    request_lock: Mutex<()>,
    next_id: AtomicU64,
    alive: AtomicBool,
}

impl StdioTransport {
    /// Spawn the configured command with piped stdin/stdout.
    ///
    /// The configured `env` entries are layered over the inherited
    /// environment. The child's stderr is shown only in verbose mode.
    pub fn spawn(config: &AdapterConfig) -> Result<Self, TransportError> {
        let mut cmd = tokio::process::Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if config.verbose { Stdio::inherit() } else { Stdio::null() })
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdin",
            ))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdout",
            ))
        })?;

        tracing::debug!(command = %config.command, pid = ?child.id(), "spawned MCP server process");

        Ok(Self {
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout).lines()),
            child: Mutex::new(child),
            request_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
            alive: AtomicBool::new(true),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn write_line(&self, json: &str) -> Result<(), TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ProcessExited);
        }

        let mut stdin = self.stdin.lock().await;
        let written = async {
            stdin.write_all(json.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                self.alive.store(false, Ordering::SeqCst);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Read the next JSON-looking line from stdout.
    ///
    /// Gives up after [`MAX_SKIP_LINES`] non-JSON lines to prevent spinning
    /// on a misconfigured server that writes logging to stdout.
    async fn read_line(&self) -> Result<String, TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ProcessExited);
        }

        let mut stdout = self.stdout.lock().await;
        let mut skipped = 0usize;
        loop {
            let Some(line) = stdout.next_line().await? else {
                self.alive.store(false, Ordering::SeqCst);
                return Err(TransportError::ProcessExited);
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') {
                return Ok(trimmed.to_string());
            }
            skipped += 1;
            if skipped >= MAX_SKIP_LINES {
                self.alive.store(false, Ordering::SeqCst);
                return Err(TransportError::Protocol(
                    "MCP server produced too many non-JSON lines on stdout".into(),
                ));
            }
            tracing::debug!(line = %trimmed, "skipping non-JSON line from MCP server stdout");
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        let _guard = self.request_lock.lock().await;

        let id = self.next_request_id();
        let json = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        tracing::debug!(id, method, "sending MCP request");
        self.write_line(&json).await?;

        loop {
            let line = self.read_line().await?;
            match classify_incoming(&line) {
                Incoming::Response(resp) if resp.id == id => return Ok(resp),
                Incoming::Response(resp) => {
                    tracing::debug!(expected_id = id, got_id = resp.id, "skipping response to an earlier request");
                }
                Incoming::ServerMessage(method) => {
                    tracing::debug!(%method, "ignoring server-initiated message");
                }
                Incoming::Unrecognized => {
                    tracing::debug!(line = %line, "skipping unrecognized message from MCP server");
                }
            }
        }
    }

    async fn send_notification(&self, method: &str) -> Result<(), TransportError> {
        let json = serde_json::to_string(&JsonRpcNotification::new(method))?;
        tracing::debug!(method, "sending MCP notification");
        self.write_line(&json).await
    }

    fn is_alive(&self) -> bool {
        if !self.alive.load(Ordering::SeqCst) {
            return false;
        }
        // A busy child lock means a close is in progress; report the flag.
        let Ok(mut child) = self.child.try_lock() else {
            return true;
        };
        match child.try_wait() {
            Ok(None) => true,
            _ => {
                self.alive.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.alive.store(false, Ordering::SeqCst);
        let mut child = self.child.lock().await;
        {
            let mut stdin = self.stdin.lock().await;
            if let Err(e) = stdin.shutdown().await {
                tracing::debug!(error = %e, "error closing MCP server stdin");
            }
        }

        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(?status, "MCP server process exited");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                tracing::warn!("MCP server process did not exit within timeout, killing");
                child.kill().await?;
                Ok(())
            }
        }
    }
}
