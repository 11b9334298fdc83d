//! `mcp-cli`: browse the MCP Registry Service and talk to MCP servers.
//!
//! The binary in `main.rs` is a thin dispatcher; every command lives under
//! [`cli`] so it can be exercised from tests.

pub mod cli;
