use std::sync::Arc;

use async_trait::async_trait;

use super::{AdapterConfig, AdapterCore, ServerAdapter, TransportKind};
use crate::context::CallContext;
use crate::error::AdapterError;
use crate::protocol::{
    CallToolResult, GetPromptResult, Implementation, Prompt, PromptArguments, ReadResourceResult, Resource, Tool,
    ToolArguments,
};
use crate::transport::{SystemOpener, TransportOpener};

/// Adapter for a server reached over streamable HTTP.
///
/// Serves both the `http` and `streamable` kinds; the kind is kept only
/// for reporting.
pub struct HttpAdapter {
    core: AdapterCore,
}

impl HttpAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        Self::with_opener(TransportKind::Http, config, Arc::new(SystemOpener))
    }

    pub fn with_opener(
        kind: TransportKind,
        config: AdapterConfig,
        opener: Arc<dyn TransportOpener>,
    ) -> Result<Self, AdapterError> {
        if !kind.is_http() {
            return Err(AdapterError::UnsupportedKind(format!("{kind} is not an HTTP transport")));
        }
        Ok(Self {
            core: AdapterCore::new(kind, config, opener)?,
        })
    }
}

#[async_trait]
impl ServerAdapter for HttpAdapter {
    fn kind(&self) -> TransportKind {
        self.core.kind()
    }

    fn config(&self) -> &AdapterConfig {
        self.core.config()
    }

    fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    async fn connect(&mut self, ctx: &CallContext) -> Result<(), AdapterError> {
        self.core.ensure_disconnected()?;
        let session = self.core.open()?;
        self.core.handshake(ctx, session).await
    }

    async fn disconnect(&mut self) -> Result<(), AdapterError> {
        self.core.disconnect().await
    }

    fn server_info(&self) -> Result<&Implementation, AdapterError> {
        self.core.server_info()
    }

    async fn list_tools(&self, ctx: &CallContext) -> Result<Vec<Tool>, AdapterError> {
        self.core.list_tools(ctx).await
    }

    async fn call_tool(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, AdapterError> {
        self.core.call_tool(ctx, name, arguments).await
    }

    async fn list_resources(&self, ctx: &CallContext) -> Result<Vec<Resource>, AdapterError> {
        self.core.list_resources(ctx).await
    }

    async fn read_resource(&self, ctx: &CallContext, uri: &str) -> Result<ReadResourceResult, AdapterError> {
        self.core.read_resource(ctx, uri).await
    }

    async fn list_prompts(&self, ctx: &CallContext) -> Result<Vec<Prompt>, AdapterError> {
        self.core.list_prompts(ctx).await
    }

    async fn get_prompt(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: PromptArguments,
    ) -> Result<GetPromptResult, AdapterError> {
        self.core.get_prompt(ctx, name, arguments).await
    }
}
