//! Config file loading through the command-line entry point.
//!
//! `MCP_CLI_CONFIG` is process-global, so every scenario runs inside one
//! test to avoid racing other tests in this binary.

use std::io::Write;

use clap::Parser;
use mc_cli::cli::{connect, load_config, Cli, Command};
use mc_domain::config::CONFIG_ENV;
use mc_mcp_client::{AdapterFactory, TransportKind};

fn write_config(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn config_file_and_flag_overrides() {
    // Registry URL from the file, then overridden by --url.
    let file = write_config(
        r#"
        [registry]
        base_url = "http://registry.internal:9000"
        timeout_ms = 5000

        [connect]
        timeout_secs = 15
        transport = "http"

        [servers.remote]
        type = "streamable"
        url = "https://mcp.example.com/mcp"
        timeout = "45s"
        "#,
    );
    std::env::set_var(CONFIG_ENV, file.path());

    let cli = Cli::try_parse_from(["mcp-cli", "ping"]).unwrap();
    let config = load_config(&cli).unwrap();
    assert_eq!(config.registry.base_url, "http://registry.internal:9000");
    assert_eq!(config.registry.timeout_ms, 5000);

    let cli = Cli::try_parse_from(["mcp-cli", "--url", "https://registry.example.org", "ping"]).unwrap();
    let config = load_config(&cli).unwrap();
    assert_eq!(config.registry.base_url, "https://registry.example.org");

    // A named profile resolves through the factory without connecting.
    let cli = Cli::try_parse_from(["mcp-cli", "connect", "--server", "remote"]).unwrap();
    let config = load_config(&cli).unwrap();
    let Command::Connect(args) = &cli.command else {
        panic!("expected connect");
    };
    let adapter = connect::build_adapter(&AdapterFactory::new(), args, &config, false).unwrap();
    assert_eq!(adapter.kind(), TransportKind::Streamable);
    assert_eq!(adapter.config().timeout.as_secs(), 45);
    assert_eq!(connect::connect_deadline(args, &config).unwrap().as_secs(), 15);

    // The connect.transport default applies when --type is absent.
    let cli = Cli::try_parse_from(["mcp-cli", "connect", "--url", "http://localhost:3000/mcp"]).unwrap();
    let Command::Connect(args) = &cli.command else {
        panic!("expected connect");
    };
    let (kind, _) = connect::explicit_config(args, &config, false).unwrap();
    assert_eq!(kind, TransportKind::Http);

    // A bad registry URL override fails validation.
    let cli = Cli::try_parse_from(["mcp-cli", "--url", "ftp://registry", "health"]).unwrap();
    let err = load_config(&cli).unwrap_err();
    assert!(err.to_string().contains("registry.base_url"), "got {err}");

    // Unparseable files are reported with their path.
    let broken = write_config("[registry\nbase_url = ");
    std::env::set_var(CONFIG_ENV, broken.path());
    let cli = Cli::try_parse_from(["mcp-cli", "ping"]).unwrap();
    let err = load_config(&cli).unwrap_err();
    assert!(err.to_string().contains("parsing"), "got {err}");

    // A missing file falls back to defaults.
    std::env::set_var(CONFIG_ENV, file.path().with_extension("absent"));
    let config = load_config(&cli).unwrap();
    assert_eq!(config.registry.base_url, "http://localhost:8080");
    assert!(config.servers.is_empty());

    std::env::remove_var(CONFIG_ENV);
}
