//! Server adapters: one uniform capability set over each transport kind.
//!
//! [`StdioAdapter`] spawns a local process and probes it for readiness
//! before the handshake; [`HttpAdapter`] talks streamable HTTP. Both compose
//! an [`AdapterCore`] that owns the connection state, the handshake and the
//! error wrapping shared by every capability call.

mod http;
mod stdio;

pub use http::HttpAdapter;
pub use stdio::StdioAdapter;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::{CallContext, Interrupt};
use crate::error::AdapterError;
use crate::protocol::{
    CallToolResult, GetPromptResult, Implementation, Prompt, PromptArguments, ReadResourceResult, Resource, Tool,
    ToolArguments,
};
use crate::session::Session;
use crate::transport::{TransportError, TransportOpener};

/// Applied whenever a zero timeout reaches a constructor.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport kind
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Transport discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Local process over stdin/stdout.
    Stdio,
    Http,
    /// Alias of `Http`; both speak streamable HTTP.
    Streamable,
}

impl TransportKind {
    pub const ALL: [TransportKind; 3] = [TransportKind::Stdio, TransportKind::Http, TransportKind::Streamable];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Http => "http",
            TransportKind::Streamable => "streamable",
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, TransportKind::Http | TransportKind::Streamable)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "http" => Ok(TransportKind::Http),
            "streamable" => Ok(TransportKind::Streamable),
            _ => Err(AdapterError::UnsupportedKind(s.to_owned())),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Adapter configuration, captured at construction.
///
/// Exactly one of `command` (stdio) or `url` (http variants) is populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Overlaid on the inherited environment of the child process.
    pub env: BTreeMap<String, String>,
    pub url: String,
    /// Bounds the initialize handshake.
    pub timeout: Duration,
    /// Diagnostic output only.
    pub verbose: bool,
}

impl AdapterConfig {
    pub fn stdio(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_TIMEOUT,
            ..Self::default()
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            ..Self::default()
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The command line or URL, for diagnostics.
    pub fn endpoint(&self) -> String {
        if !self.url.is_empty() {
            return self.url.clone();
        }
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn with_default_timeout(mut self) -> Self {
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        self
    }

    /// Check the fields required by `kind`. Performs no I/O.
    pub fn validate(&self, kind: TransportKind) -> Result<(), AdapterError> {
        let invalid = |msg: &str| Err(AdapterError::InvalidConfig(format!("{kind}: {msg}")));

        if kind.is_http() {
            let url = self.url.trim();
            if url.is_empty() {
                return invalid("url is required");
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return invalid("url must start with http:// or https://");
            }
            if let Err(e) = reqwest::Url::parse(url) {
                return invalid(&format!("url is not valid: {e}"));
            }
            if !self.command.is_empty() {
                return invalid("command must not be set");
            }
        } else {
            if self.command.trim().is_empty() {
                return invalid("command is required");
            }
            if !self.url.is_empty() {
                return invalid("url must not be set");
            }
        }

        if self.timeout.is_zero() {
            return invalid("timeout must be positive");
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Uniform capability set of a connection to one MCP server.
///
/// An adapter owns at most one live transport at a time. Usage is single
/// owner, one call at a time; `&mut self` on the lifecycle methods enforces
/// that for `connect` and `disconnect`.
#[async_trait]
pub trait ServerAdapter: Send + Sync {
    fn kind(&self) -> TransportKind;

    fn config(&self) -> &AdapterConfig;

    fn is_connected(&self) -> bool;

    /// Open the transport and run the handshake.
    async fn connect(&mut self, ctx: &CallContext) -> Result<(), AdapterError>;

    /// Release the transport. A no-op when already disconnected.
    async fn disconnect(&mut self) -> Result<(), AdapterError>;

    fn server_info(&self) -> Result<&Implementation, AdapterError>;

    async fn list_tools(&self, ctx: &CallContext) -> Result<Vec<Tool>, AdapterError>;

    async fn call_tool(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, AdapterError>;

    async fn list_resources(&self, ctx: &CallContext) -> Result<Vec<Resource>, AdapterError>;

    async fn read_resource(&self, ctx: &CallContext, uri: &str) -> Result<ReadResourceResult, AdapterError>;

    async fn list_prompts(&self, ctx: &CallContext) -> Result<Vec<Prompt>, AdapterError>;

    async fn get_prompt(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: PromptArguments,
    ) -> Result<GetPromptResult, AdapterError>;
}

impl fmt::Debug for dyn ServerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerAdapter")
            .field("kind", &self.kind())
            .field("endpoint", &self.config().endpoint())
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared core
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Server identity exists only alongside a live session.
enum ConnectionState {
    Disconnected,
    Connected { session: Session, server: Implementation },
}

/// State and behavior shared by every adapter variant.
pub(crate) struct AdapterCore {
    kind: TransportKind,
    config: AdapterConfig,
    opener: Arc<dyn TransportOpener>,
    state: ConnectionState,
}

impl AdapterCore {
    pub(crate) fn new(
        kind: TransportKind,
        config: AdapterConfig,
        opener: Arc<dyn TransportOpener>,
    ) -> Result<Self, AdapterError> {
        let config = config.with_default_timeout();
        config.validate(kind)?;
        Ok(Self {
            kind,
            config,
            opener,
            state: ConnectionState::Disconnected,
        })
    }

    pub(crate) fn kind(&self) -> TransportKind {
        self.kind
    }

    pub(crate) fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub(crate) fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    pub(crate) fn ensure_disconnected(&self) -> Result<(), AdapterError> {
        if self.is_connected() {
            return Err(AdapterError::AlreadyConnected);
        }
        Ok(())
    }

    /// Create the transport session for one connection attempt.
    pub(crate) fn open(&self) -> Result<Session, AdapterError> {
        verbose!(self.config, kind = %self.kind, endpoint = %self.config.endpoint(), "opening MCP transport");
        let transport = self.opener.open(self.kind, &self.config).map_err(|source| AdapterError::OpenFailed {
            kind: self.kind,
            source,
        })?;
        Ok(Session::new(transport))
    }

    /// Run the initialize exchange; on success the adapter becomes connected.
    ///
    /// The exchange is bounded by the caller's context narrowed to the
    /// configured timeout. On failure the session is released before the
    /// error is returned.
    pub(crate) async fn handshake(&mut self, ctx: &CallContext, session: Session) -> Result<(), AdapterError> {
        let scoped = ctx.with_timeout(self.config.timeout);
        verbose!(self.config, timeout = ?self.config.timeout, "sending initialize request");

        match session.initialize(&scoped).await {
            Ok(result) => {
                verbose!(
                    self.config,
                    server = %result.server_info.name,
                    version = %result.server_info.version,
                    protocol = %result.protocol_version,
                    "connected to MCP server"
                );
                self.state = ConnectionState::Connected {
                    session,
                    server: result.server_info,
                };
                Ok(())
            }
            Err(err) => {
                self.release(session).await;
                Err(match err {
                    TransportError::Interrupted(Interrupt::Cancelled) => AdapterError::Cancelled {
                        operation: "initialize",
                        reason: Interrupt::Cancelled,
                    },
                    other => AdapterError::HandshakeFailed(other),
                })
            }
        }
    }

    /// Best-effort release after a failed connect.
    pub(crate) async fn release(&self, session: Session) {
        if let Err(e) = session.close().await {
            verbose!(self.config, error = %e, "failed to release transport after connect failure");
        }
    }

    pub(crate) async fn disconnect(&mut self) -> Result<(), AdapterError> {
        let ConnectionState::Connected { session, server } =
            std::mem::replace(&mut self.state, ConnectionState::Disconnected)
        else {
            return Ok(());
        };
        verbose!(self.config, server = %server.name, "disconnecting from MCP server");
        session.close().await.map_err(AdapterError::Disconnect)
    }

    pub(crate) fn server_info(&self) -> Result<&Implementation, AdapterError> {
        match &self.state {
            ConnectionState::Connected { server, .. } => Ok(server),
            ConnectionState::Disconnected => Err(AdapterError::NotConnected),
        }
    }

    fn session(&self) -> Result<&Session, AdapterError> {
        match &self.state {
            ConnectionState::Connected { session, .. } => Ok(session),
            ConnectionState::Disconnected => Err(AdapterError::NotConnected),
        }
    }

    pub(crate) async fn list_tools(&self, ctx: &CallContext) -> Result<Vec<Tool>, AdapterError> {
        let session = self.session()?;
        verbose!(self.config, "listing tools");
        session
            .list_tools(ctx)
            .await
            .map_err(|e| AdapterError::operation("list tools", self.config.endpoint(), e))
    }

    pub(crate) async fn call_tool(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, AdapterError> {
        let session = self.session()?;
        verbose!(self.config, tool = name, "calling tool");
        session
            .call_tool(ctx, name, arguments)
            .await
            .map_err(|e| AdapterError::operation("call tool", name, e))
    }

    pub(crate) async fn list_resources(&self, ctx: &CallContext) -> Result<Vec<Resource>, AdapterError> {
        let session = self.session()?;
        verbose!(self.config, "listing resources");
        session
            .list_resources(ctx)
            .await
            .map_err(|e| AdapterError::operation("list resources", self.config.endpoint(), e))
    }

    pub(crate) async fn read_resource(&self, ctx: &CallContext, uri: &str) -> Result<ReadResourceResult, AdapterError> {
        let session = self.session()?;
        verbose!(self.config, uri, "reading resource");
        session
            .read_resource(ctx, uri)
            .await
            .map_err(|e| AdapterError::operation("read resource", uri, e))
    }

    pub(crate) async fn list_prompts(&self, ctx: &CallContext) -> Result<Vec<Prompt>, AdapterError> {
        let session = self.session()?;
        verbose!(self.config, "listing prompts");
        session
            .list_prompts(ctx)
            .await
            .map_err(|e| AdapterError::operation("list prompts", self.config.endpoint(), e))
    }

    pub(crate) async fn get_prompt(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: PromptArguments,
    ) -> Result<GetPromptResult, AdapterError> {
        let session = self.session()?;
        verbose!(self.config, prompt = name, "getting prompt");
        session
            .get_prompt(ctx, name, arguments)
            .await
            .map_err(|e| AdapterError::operation("get prompt", name, e))
    }
}
