//! Typed MCP calls over a transport.
//!
//! A [`Session`] owns exactly one transport. Every call is bounded by the
//! caller's [`CallContext`]; list calls follow `nextCursor` until the
//! server stops returning one.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::context::CallContext;
use crate::protocol::{
    initialize_params, CallToolResult, GetPromptResult, InitializeResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult, Prompt, PromptArguments, ReadResourceResult, Resource, Tool, ToolArguments,
};
use crate::transport::{McpTransport, TransportError};

pub struct Session {
    transport: Box<dyn McpTransport>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("alive", &self.transport.is_alive()).finish()
    }
}

impl Session {
    pub fn new(transport: Box<dyn McpTransport>) -> Self {
        Self { transport }
    }

    pub fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    async fn call(&self, ctx: &CallContext, method: &str, params: Option<Value>) -> Result<Value, TransportError> {
        let resp = ctx.run(self.transport.send_request(method, params)).await??;
        Ok(resp.into_result()?)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, TransportError> {
        let value = self.call(ctx, method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run the `initialize` exchange and announce `notifications/initialized`.
    pub async fn initialize(&self, ctx: &CallContext) -> Result<InitializeResult, TransportError> {
        let params = serde_json::to_value(initialize_params())?;
        let result: InitializeResult = self.request(ctx, "initialize", Some(params)).await?;
        ctx.run(self.transport.send_notification("notifications/initialized")).await??;
        Ok(result)
    }

    /// Send a `ping`.
    ///
    /// Succeeds on any JSON-RPC response, including an error object: a
    /// server that answers at all is running.
    pub async fn ping(&self, ctx: &CallContext) -> Result<(), TransportError> {
        let resp = ctx.run(self.transport.send_request("ping", None)).await??;
        if let Some(err) = resp.error {
            tracing::debug!(code = err.code, message = %err.message, "ping answered with an error");
        }
        Ok(())
    }

    /// Fetch every page of a list method.
    async fn list_all<R, T>(
        &self,
        ctx: &CallContext,
        method: &str,
        split: impl Fn(R) -> (Vec<T>, Option<String>),
    ) -> Result<Vec<T>, TransportError>
    where
        R: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: R = self.request(ctx, method, params).await?;
            let (batch, next) = split(page);
            items.extend(batch);
            match next.filter(|c| !c.is_empty()) {
                // A repeated cursor would loop forever.
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(items)
    }

    pub async fn list_tools(&self, ctx: &CallContext) -> Result<Vec<Tool>, TransportError> {
        self.list_all(ctx, "tools/list", |p: ListToolsResult| (p.tools, p.next_cursor)).await
    }

    pub async fn list_resources(&self, ctx: &CallContext) -> Result<Vec<Resource>, TransportError> {
        self.list_all(ctx, "resources/list", |p: ListResourcesResult| (p.resources, p.next_cursor))
            .await
    }

    pub async fn list_prompts(&self, ctx: &CallContext) -> Result<Vec<Prompt>, TransportError> {
        self.list_all(ctx, "prompts/list", |p: ListPromptsResult| (p.prompts, p.next_cursor)).await
    }

    pub async fn call_tool(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, TransportError> {
        let params = json!({ "name": name, "arguments": arguments });
        self.request(ctx, "tools/call", Some(params)).await
    }

    pub async fn read_resource(&self, ctx: &CallContext, uri: &str) -> Result<ReadResourceResult, TransportError> {
        self.request(ctx, "resources/read", Some(json!({ "uri": uri }))).await
    }

    pub async fn get_prompt(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: PromptArguments,
    ) -> Result<GetPromptResult, TransportError> {
        let params = json!({ "name": name, "arguments": arguments });
        self.request(ctx, "prompts/get", Some(params)).await
    }

    /// Close the transport. Consumes the session so it is closed once.
    pub async fn close(self) -> Result<(), TransportError> {
        self.transport.close().await
    }
}
