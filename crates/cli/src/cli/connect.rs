//! `mcp-cli connect`: open an adapter, then list capabilities or start
//! the interactive shell.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use mc_domain::config::Config;
use mc_mcp_client::factory::{parse_duration, split_command_line};
use mc_mcp_client::{
    AdapterConfig, AdapterFactory, CallContext, Prompt, Resource, ServerAdapter, Tool, TransportKind,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::output::{truncate, Table};
use super::{interactive, ConnectArgs};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse repeated `--env KEY=VALUE` flags.
pub fn parse_env(pairs: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_owned(), value.to_owned())),
            _ => anyhow::bail!("invalid --env {pair:?}: expected KEY=VALUE"),
        })
        .collect()
}

/// The `--timeout` flag, if given.
fn timeout_flag(args: &ConnectArgs) -> anyhow::Result<Option<Duration>> {
    args.timeout
        .as_deref()
        .map(|raw| parse_duration(raw).with_context(|| format!("invalid --timeout {raw:?}")))
        .transpose()
}

/// Overall deadline for opening the connection, probing included.
pub fn connect_deadline(args: &ConnectArgs, config: &Config) -> anyhow::Result<Duration> {
    Ok(timeout_flag(args)?.unwrap_or(Duration::from_secs(config.connect.timeout_secs)))
}

/// Build a kind and adapter config from the explicit connection flags.
///
/// A `--command` with spaces and no `--args` is split into a command and
/// its arguments. The kind falls back to `connect.transport`.
pub fn explicit_config(
    args: &ConnectArgs,
    config: &Config,
    verbose: bool,
) -> anyhow::Result<(TransportKind, AdapterConfig)> {
    let kind_name = args.kind.as_deref().unwrap_or(&config.connect.transport);
    let kind: TransportKind = kind_name.parse()?;

    let mut command = args.command.clone().unwrap_or_default();
    let mut command_args = args.args.clone();
    if command_args.is_empty() && command.trim().contains(char::is_whitespace) {
        let mut words = split_command_line(&command)
            .map_err(|reason| anyhow::anyhow!("invalid --command {command:?}: {reason}"))?;
        if !words.is_empty() {
            command = words.remove(0);
            command_args = words;
        }
    }

    let adapter_config = AdapterConfig {
        command,
        args: command_args,
        env: parse_env(&args.env)?,
        url: args.server_url.clone().unwrap_or_default(),
        timeout: timeout_flag(args)?.unwrap_or_default(),
        verbose,
    };
    Ok((kind, adapter_config))
}

/// Pick the adapter described by `--server`, `--endpoint` or the explicit
/// flags, in that order of precedence.
pub fn build_adapter(
    factory: &AdapterFactory,
    args: &ConnectArgs,
    config: &Config,
    verbose: bool,
) -> anyhow::Result<Box<dyn ServerAdapter>> {
    if let Some(name) = &args.server {
        let mut table = config
            .profile(name)
            .cloned()
            .with_context(|| format!("no server profile named {name:?} in the config file"))?;
        if verbose {
            table.insert("verbose".into(), Value::Bool(true));
        }
        return factory
            .create_from_loose_config(&table)
            .with_context(|| format!("invalid server profile {name:?}"));
    }

    if let Some(endpoint) = &args.endpoint {
        return Ok(factory.create_from_endpoint(endpoint, verbose)?);
    }

    let (kind, adapter_config) = explicit_config(args, config, verbose)?;
    factory
        .create(kind, adapter_config)
        .context("failed to create adapter")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Capability tables
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn tools_table(tools: &[Tool]) -> Table {
    let mut table = Table::new(["NAME", "DESCRIPTION"]);
    for tool in tools {
        table.row([tool.name.clone(), truncate(&tool.description, 60)]);
    }
    table
}

pub fn resources_table(resources: &[Resource]) -> Table {
    let mut table = Table::new(["URI", "NAME", "DESCRIPTION"]);
    for res in resources {
        table.row([res.uri.clone(), res.name.clone(), truncate(&res.description, 50)]);
    }
    table
}

pub fn prompts_table(prompts: &[Prompt]) -> Table {
    let mut table = Table::new(["NAME", "ARGUMENTS", "DESCRIPTION"]);
    for prompt in prompts {
        let arguments = prompt
            .arguments
            .iter()
            .map(|a| if a.required { format!("{}*", a.name) } else { a.name.clone() })
            .collect::<Vec<_>>()
            .join(", ");
        table.row([prompt.name.clone(), arguments, truncate(&prompt.description, 60)]);
    }
    table
}

fn print_section(title: &str, count: usize, table: Table) {
    println!("\n{title} ({count} available):");
    if table.is_empty() {
        println!("  No {} available", title.to_lowercase());
    } else {
        print!("{}", table.render());
    }
}

/// Print tools, resources and prompts. A failed listing is reported and
/// the next one still runs; cancellation stops everything.
async fn show_capabilities(adapter: &dyn ServerAdapter, ctx: &CallContext) -> anyhow::Result<()> {
    println!("Server Capabilities:");
    println!("====================");

    match adapter.list_tools(ctx).await {
        Ok(tools) => print_section("Tools", tools.len(), tools_table(&tools)),
        Err(e) if e.is_cancelled() => return Err(e.into()),
        Err(e) => println!("\nFailed to list tools: {e}"),
    }
    match adapter.list_resources(ctx).await {
        Ok(resources) => print_section("Resources", resources.len(), resources_table(&resources)),
        Err(e) if e.is_cancelled() => return Err(e.into()),
        Err(e) => println!("\nFailed to list resources: {e}"),
    }
    match adapter.list_prompts(ctx).await {
        Ok(prompts) => print_section("Prompts", prompts.len(), prompts_table(&prompts)),
        Err(e) if e.is_cancelled() => return Err(e.into()),
        Err(e) => println!("\nFailed to list prompts: {e}"),
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cancel `token` on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling");
            token.cancel();
        }
    })
}

pub async fn run(args: ConnectArgs, config: &Config, verbose: bool) -> anyhow::Result<()> {
    let factory = AdapterFactory::new();
    let mut adapter = build_adapter(&factory, &args, config, verbose)?;
    let deadline = connect_deadline(&args, config)?;

    let token = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(token.clone());

    tracing::info!(
        kind = %adapter.kind(),
        endpoint = %adapter.config().endpoint(),
        "connecting to MCP server"
    );
    let ctx = CallContext::from_token(token.clone()).with_timeout(deadline);
    if let Err(e) = adapter.connect(&ctx).await {
        watcher.abort();
        return Err(anyhow::Error::new(e).context("failed to connect to server"));
    }

    let server = adapter.server_info()?.clone();
    println!("Connected to MCP server: {} (version {})\n", server.name, server.version);

    let outcome = if args.interactive {
        // The shell installs its own per-command interrupt handling.
        watcher.abort();
        interactive::run(adapter.as_ref()).await
    } else {
        let ctx = CallContext::from_token(token).with_timeout(deadline);
        let shown = show_capabilities(adapter.as_ref(), &ctx).await;
        watcher.abort();
        shown
    };

    if let Err(e) = adapter.disconnect().await {
        tracing::warn!(error = %e, "disconnect failed");
    }
    outcome
}
