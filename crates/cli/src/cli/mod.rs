pub mod connect;
pub mod interactive;
pub mod output;
pub mod registry;

use clap::{Args, Parser, Subcommand};
use mc_domain::config::{Config, ConfigSeverity};

/// Explore the MCP Registry and connect to MCP servers.
#[derive(Debug, Parser)]
#[command(name = "mcp-cli", version, about)]
pub struct Cli {
    /// Registry base URL (overrides `registry.base_url` from the config file).
    #[arg(long)]
    pub url: Option<String>,

    /// Verbose output: progress on stderr and transport diagnostics.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch resources from the registry.
    #[command(subcommand)]
    Get(GetCommand),
    /// Check the registry's health endpoint.
    Health,
    /// Ping the registry.
    Ping,
    /// Connect to an MCP server and explore its capabilities.
    Connect(ConnectArgs),
}

#[derive(Debug, Subcommand)]
pub enum GetCommand {
    /// List servers, one page at a time.
    Servers {
        /// Maximum number of servers to return (1-100).
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: u32,
        /// Pagination cursor from a previous page.
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Show details of one server by ID or name.
    Server {
        /// A server ID (UUID) or a server name.
        identifier: String,
        /// Treat the identifier as a name even if it looks like a UUID.
        #[arg(long)]
        name: bool,
        /// List every server whose name contains the identifier.
        #[arg(long)]
        show_matches: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConnectArgs {
    /// Transport type (stdio, http, streamable). Defaults to `connect.transport`.
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// Server URL for HTTP-based transports.
    #[arg(long = "url", id = "server_url")]
    pub server_url: Option<String>,
    /// Command to run for stdio connections.
    #[arg(long)]
    pub command: Option<String>,
    /// Argument for the command (repeatable).
    #[arg(long = "args", allow_hyphen_values = true)]
    pub args: Vec<String>,
    /// Environment variable for the command, as KEY=VALUE (repeatable).
    #[arg(long = "env")]
    pub env: Vec<String>,
    /// Connection timeout, e.g. `60s`, `1m30s`.
    #[arg(long)]
    pub timeout: Option<String>,
    /// A URL or a full command line; picks the transport automatically.
    #[arg(long, conflicts_with_all = ["kind", "server_url", "command", "args", "server"])]
    pub endpoint: Option<String>,
    /// Named server profile from the config file.
    #[arg(long, conflicts_with_all = ["kind", "server_url", "command", "args"])]
    pub server: Option<String>,
    /// Open an interactive shell after connecting.
    #[arg(short, long)]
    pub interactive: bool,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration file and apply global flag overrides.
///
/// Validation errors are fatal; warnings are logged.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let (mut config, path) = Config::load()?;

    if let Some(url) = &cli.url {
        config.registry.base_url = url.clone();
    }

    let issues = config.validate();
    for issue in &issues {
        tracing::warn!(path = %path.display(), "{issue}");
    }
    if let Some(issue) = issues.iter().find(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!("invalid configuration ({}): {issue}", path.display());
    }

    Ok(config)
}
