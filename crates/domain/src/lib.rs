//! `mc-domain`: types shared by every mcp-cli crate.
//!
//! - [`error`]: the common error type for registry and config plumbing.
//! - [`config`]: the TOML configuration file model and loader.
//! - [`registry`]: DTOs returned by the MCP Registry Service.

pub mod config;
pub mod error;
pub mod registry;
