use std::sync::Arc;

use async_trait::async_trait;

use super::{AdapterConfig, AdapterCore, ServerAdapter, TransportKind};
use crate::context::CallContext;
use crate::error::AdapterError;
use crate::probe::{self, ProbePolicy};
use crate::protocol::{
    CallToolResult, GetPromptResult, Implementation, Prompt, PromptArguments, ReadResourceResult, Resource, Tool,
    ToolArguments,
};
use crate::transport::{SystemOpener, TransportOpener};

/// Adapter for a server launched as a local child process.
pub struct StdioAdapter {
    core: AdapterCore,
    probe: ProbePolicy,
}

impl StdioAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        Self::with_opener(config, Arc::new(SystemOpener))
    }

    pub fn with_opener(config: AdapterConfig, opener: Arc<dyn TransportOpener>) -> Result<Self, AdapterError> {
        Ok(Self {
            core: AdapterCore::new(TransportKind::Stdio, config, opener)?,
            probe: ProbePolicy::default(),
        })
    }

    pub fn with_probe_policy(mut self, policy: ProbePolicy) -> Self {
        self.probe = policy;
        self
    }

    pub fn probe_policy(&self) -> &ProbePolicy {
        &self.probe
    }
}

#[async_trait]
impl ServerAdapter for StdioAdapter {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
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

        // Process startup is bounded by the probe policy, not the handshake timeout.
        if let Err(err) = probe::wait_until_ready(&session, ctx, &self.probe, self.core.config()).await {
            self.core.release(session).await;
            return Err(err);
        }

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
