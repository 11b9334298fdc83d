//! MCP transport layer.
//!
//! Each adapter talks to its server through one transport:
//! - **Stdio**: spawn a child process, send JSON-RPC over stdin/stdout.
//! - **Http**: streamable HTTP, one `POST` per message with JSON or SSE replies.
//!
//! Transports only move JSON-RPC envelopes. Deadlines and cancellation are
//! applied one level up by [`crate::Session`], which drops the in-flight
//! future when the caller's context ends.

mod http;
mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::{AdapterConfig, TransportKind};
use crate::context::Interrupt;
use crate::protocol::{JsonRpcError, JsonRpcResponse};

/// Trait for MCP server transports.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a JSON-RPC request and wait for the corresponding response.
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError>;

    /// Send a JSON-RPC notification (no response expected).
    async fn send_notification(&self, method: &str) -> Result<(), TransportError>;

    /// Check if the transport is still alive.
    fn is_alive(&self) -> bool;

    /// Release the underlying process or connection.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MCP server process has exited")]
    ProcessExited,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("server returned {0}")]
    Rpc(#[from] JsonRpcError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Interrupted(#[from] Interrupt),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Interrupted(Interrupt::DeadlineExceeded)
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Opening transports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Creates the transport for one connection attempt.
///
/// Adapters call this once per `connect`; the returned transport is owned
/// by that connection and closed exactly once.
pub trait TransportOpener: Send + Sync {
    fn open(&self, kind: TransportKind, config: &AdapterConfig) -> Result<Box<dyn McpTransport>, TransportError>;
}

/// Opens real transports: spawns processes and builds HTTP clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl TransportOpener for SystemOpener {
    fn open(&self, kind: TransportKind, config: &AdapterConfig) -> Result<Box<dyn McpTransport>, TransportError> {
        match kind {
            TransportKind::Stdio => Ok(Box::new(StdioTransport::spawn(config)?)),
            TransportKind::Http | TransportKind::Streamable => Ok(Box::new(HttpTransport::new(&config.url)?)),
        }
    }
}
