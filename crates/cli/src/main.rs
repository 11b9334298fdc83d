use clap::Parser;
use tracing_subscriber::EnvFilter;

use mc_cli::cli::{self, Cli, Command, GetCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(cli.verbose);

    let config = cli::load_config(&cli)?;

    match cli.command {
        Command::Get(GetCommand::Servers { limit, cursor }) => {
            let registry = cli::registry::client(&config)?;
            cli::registry::list_servers(&registry, cursor.as_deref(), limit).await
        }
        Command::Get(GetCommand::Server {
            identifier,
            name,
            show_matches,
        }) => {
            let registry = cli::registry::client(&config)?;
            cli::registry::show_server(&registry, &identifier, name, show_matches).await
        }
        Command::Health => {
            let registry = cli::registry::client(&config)?;
            let healthy = cli::registry::health(&registry).await?;
            if !healthy {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Ping => {
            let registry = cli::registry::client(&config)?;
            cli::registry::ping(&registry).await
        }
        Command::Connect(args) => cli::connect::run(args, &config, cli.verbose).await,
    }
}

/// Compact human-readable logs on stderr, keeping stdout for command output.
///
/// `RUST_LOG` wins when set; otherwise `-v` raises the level from `warn`.
fn init_cli_tracing(verbose: bool) {
    let fallback = if verbose { "info,mc_=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
