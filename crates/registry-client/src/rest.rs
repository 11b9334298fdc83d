//! REST implementation of [`RegistryProvider`].

use std::time::Duration;

use async_trait::async_trait;
use mc_domain::config::RegistryConfig;
use mc_domain::error::{Error, Result};
use mc_domain::registry::{HealthStatus, PingStatus, ServerDetail, ServersPage};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::provider::RegistryProvider;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the registry's `/v0` API.
///
/// The underlying `reqwest::Client` keeps a connection pool; clone freely.
/// No request is retried.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl RegistryClient {
    pub fn new(cfg: &RegistryConfig) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `rb` and decode a JSON body, mapping non-2xx statuses to `Api`.
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, rb: RequestBuilder) -> Result<T> {
        tracing::debug!(endpoint, "registry request");
        let resp = rb.send().await.map_err(from_reqwest)?;
        let status = resp.status();
        let body = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::Other(format!("failed to parse {endpoint} response: {e}: {body}")))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl RegistryProvider for RegistryClient {
    async fn list_servers(&self, cursor: Option<&str>, limit: u32) -> Result<ServersPage> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            query.push(("cursor", cursor.to_owned()));
        }
        if limit > 0 {
            query.push(("limit", limit.to_string()));
        }

        let url = self.url("/v0/servers");
        self.fetch("GET /v0/servers", self.http.get(&url).query(&query)).await
    }

    async fn get_server(&self, id: &str) -> Result<ServerDetail> {
        let url = self.url(&format!("/v0/servers/{id}"));
        match self.fetch("GET /v0/servers/{id}", self.http.get(&url)).await {
            Err(Error::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(Error::NotFound(format!("server {id}")))
            }
            other => other,
        }
    }

    async fn health(&self) -> Result<HealthStatus> {
        let url = self.url("/v0/health");
        self.fetch("GET /v0/health", self.http.get(&url)).await
    }

    async fn ping(&self) -> Result<PingStatus> {
        let url = self.url("/v0/ping");
        self.fetch("GET /v0/ping", self.http.get(&url)).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
