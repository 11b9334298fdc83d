//! The `RegistryProvider` trait defines the registry API surface.

use async_trait::async_trait;
use mc_domain::error::{Error, Result};
use mc_domain::registry::{HealthStatus, PingStatus, Server, ServerDetail, ServersPage};

/// Page size used when scanning the whole catalogue.
pub const NAME_SCAN_PAGE_SIZE: u32 = 100;

/// Abstraction over the MCP Registry Service.
#[async_trait]
pub trait RegistryProvider: Send + Sync {
    /// One page of servers (GET /v0/servers). `cursor` is opaque.
    async fn list_servers(&self, cursor: Option<&str>, limit: u32) -> Result<ServersPage>;

    /// Full server record (GET /v0/servers/{id}).
    async fn get_server(&self, id: &str) -> Result<ServerDetail>;

    /// GET /v0/health.
    async fn health(&self) -> Result<HealthStatus>;

    /// GET /v0/ping.
    async fn ping(&self) -> Result<PingStatus>;

    /// Resolve an exact server name to its full record.
    async fn get_server_by_name(&self, name: &str) -> Result<ServerDetail> {
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_servers(cursor.as_deref(), NAME_SCAN_PAGE_SIZE).await?;
            if let Some(found) = page.servers.iter().find(|s| s.name == name) {
                return self.get_server(&found.id).await;
            }
            match page.metadata.next() {
                Some(next) if cursor.as_deref() != Some(next) => cursor = Some(next.to_owned()),
                _ => return Err(Error::NotFound(format!("server with name {name:?}"))),
            }
        }
    }

    /// Every server whose name contains `pattern`, ignoring case.
    async fn find_servers_by_pattern(&self, pattern: &str) -> Result<Vec<Server>> {
        let needle = pattern.to_lowercase();
        let mut matches = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_servers(cursor.as_deref(), NAME_SCAN_PAGE_SIZE).await?;
            let next = page.metadata.next().map(str::to_owned);
            matches.extend(page.servers.into_iter().filter(|s| s.name.to_lowercase().contains(&needle)));
            match next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }
        tracing::debug!(pattern, count = matches.len(), "pattern search finished");
        Ok(matches)
    }
}
