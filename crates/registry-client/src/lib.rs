//! `mc-registry`: client for the MCP Registry Service.
//!
//! The [`RegistryProvider`] trait abstracts the `/v0` API; its provided
//! methods walk pages to resolve servers by name or substring, so they
//! work over any implementation. [`RegistryClient`] is the `reqwest`
//! implementation.
//!
//! ```rust,no_run
//! use mc_domain::config::RegistryConfig;
//! use mc_registry::{RegistryClient, RegistryProvider};
//!
//! # async fn example() -> mc_domain::error::Result<()> {
//! let client = RegistryClient::new(&RegistryConfig::default())?;
//! let page = client.list_servers(None, 30).await?;
//! for server in &page.servers {
//!     println!("{} {}", server.id, server.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod rest;

pub use provider::{RegistryProvider, NAME_SCAN_PAGE_SIZE};
pub use rest::{from_reqwest, RegistryClient};
