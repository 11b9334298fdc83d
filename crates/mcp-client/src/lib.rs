//! `mc-mcp-client`: client-side MCP adapters for mcp-cli.
//!
//! This crate provides:
//! - JSON-RPC 2.0 / MCP payload types ([`protocol`]).
//! - Transports that carry those messages: a stdio transport that spawns a
//!   child process, and a streamable-HTTP transport ([`transport`]).
//! - A typed [`Session`] over any transport.
//! - The [`ServerAdapter`] abstraction with stdio and HTTP variants, owning
//!   the connect / handshake / disconnect lifecycle ([`adapter`]).
//! - Readiness probing for freshly spawned processes ([`probe`]).
//! - An [`AdapterFactory`] that builds and validates adapters from typed
//!   config, loose config tables, or a single endpoint string.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use mc_mcp_client::{AdapterFactory, CallContext};
//!
//! let mut adapter = AdapterFactory::new().create_from_endpoint("python server.py", false)?;
//! let ctx = CallContext::timeout(Duration::from_secs(60));
//! adapter.connect(&ctx).await?;
//!
//! for tool in adapter.list_tools(&ctx).await? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//!
//! adapter.disconnect().await?;
//! ```

/// Emit an `info` event only when the adapter config asks for verbose output.
macro_rules! verbose {
    ($config:expr, $($arg:tt)+) => {
        if $config.verbose {
            tracing::info!($($arg)+);
        }
    };
}

pub mod adapter;
pub mod context;
pub mod error;
pub mod factory;
pub mod probe;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience.
pub use adapter::{AdapterConfig, HttpAdapter, ServerAdapter, StdioAdapter, TransportKind, DEFAULT_TIMEOUT};
pub use context::{CallContext, Interrupt};
pub use error::AdapterError;
pub use factory::AdapterFactory;
pub use probe::ProbePolicy;
pub use protocol::{
    CallToolResult, Content, GetPromptResult, Implementation, Prompt, PromptArguments, ReadResourceResult,
    Resource, Tool, ToolArguments,
};
pub use session::Session;
pub use transport::{McpTransport, SystemOpener, TransportError, TransportOpener};
