//! `get servers`, `get server`, `health` and `ping`.

use std::fmt::Write as _;
use std::sync::OnceLock;

use anyhow::Context;
use mc_domain::config::Config;
use mc_domain::registry::{Argument, Server, ServerDetail};
use mc_registry::{RegistryClient, RegistryProvider};
use regex::Regex;

use super::output::{truncate, Table};

const DESCRIPTION_WIDTH: usize = 50;

pub fn client(config: &Config) -> anyhow::Result<RegistryClient> {
    RegistryClient::new(&config.registry)
        .with_context(|| format!("creating registry client for {}", config.registry.base_url))
}

/// Whether `s` looks like a canonical hyphenated UUID.
pub fn is_uuid(s: &str) -> bool {
    static UUID: OnceLock<Option<Regex>> = OnceLock::new();
    UUID.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").ok()
    })
    .as_ref()
    .is_some_and(|re| re.is_match(s))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// get servers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn servers_table(servers: &[Server]) -> Table {
    let mut table = Table::new(["ID", "NAME", "VERSION", "DESCRIPTION"]);
    for server in servers {
        table.row([
            server.id.clone(),
            server.name.clone(),
            server.version_detail.version.clone(),
            truncate(&server.description, DESCRIPTION_WIDTH),
        ]);
    }
    table
}

pub async fn list_servers<P: RegistryProvider>(
    registry: &P,
    cursor: Option<&str>,
    limit: u32,
) -> anyhow::Result<()> {
    let page = registry
        .list_servers(cursor, limit)
        .await
        .context("failed to fetch servers")?;
    tracing::info!(count = page.servers.len(), "fetched servers");

    if page.servers.is_empty() {
        println!("No servers found.");
        return Ok(());
    }

    print!("{}", servers_table(&page.servers).render());
    if let Some(next) = page.metadata.next() {
        println!();
        println!("Next cursor: {next}");
        println!("Use --cursor to continue pagination");
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// get server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of resolving a server identifier.
#[derive(Debug)]
pub enum Lookup {
    Detail(Box<ServerDetail>),
    Matches(Vec<Server>),
}

/// Resolve `identifier` the way `get server` does.
///
/// UUID-shaped identifiers are fetched by id unless `by_name` is set.
/// Names try an exact match first and fall back to a substring search; a
/// single hit is expanded to its full record.
pub async fn lookup_server<P: RegistryProvider>(
    registry: &P,
    identifier: &str,
    by_name: bool,
    show_matches: bool,
) -> anyhow::Result<Lookup> {
    if is_uuid(identifier) && !by_name {
        tracing::info!(id = identifier, "looking up server by id");
        let detail = registry
            .get_server(identifier)
            .await
            .context("failed to fetch server by ID")?;
        return Ok(Lookup::Detail(Box::new(detail)));
    }

    if show_matches {
        let matches = registry
            .find_servers_by_pattern(identifier)
            .await
            .context("failed to search servers")?;
        return Ok(Lookup::Matches(matches));
    }

    tracing::info!(name = identifier, "looking up server by name");
    match registry.get_server_by_name(identifier).await {
        Ok(detail) => Ok(Lookup::Detail(Box::new(detail))),
        Err(e) if e.is_not_found() => {
            let mut matches = registry
                .find_servers_by_pattern(identifier)
                .await
                .context("failed to search servers")?;
            match matches.len() {
                0 => anyhow::bail!("no servers found matching '{identifier}'"),
                1 => {
                    let only = matches.remove(0);
                    tracing::info!(name = %only.name, "found single match");
                    let detail = registry
                        .get_server(&only.id)
                        .await
                        .context("failed to fetch server details")?;
                    Ok(Lookup::Detail(Box::new(detail)))
                }
                _ => Ok(Lookup::Matches(matches)),
            }
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to fetch server by name")),
    }
}

pub async fn show_server<P: RegistryProvider>(
    registry: &P,
    identifier: &str,
    by_name: bool,
    show_matches: bool,
) -> anyhow::Result<()> {
    match lookup_server(registry, identifier, by_name, show_matches).await? {
        Lookup::Detail(detail) => print!("{}", render_server_detail(&detail)),
        Lookup::Matches(matches) if matches.is_empty() => {
            println!("No servers found matching pattern '{identifier}'");
        }
        Lookup::Matches(matches) => {
            println!("Found {} server(s) matching '{identifier}':", matches.len());
            println!();
            print!("{}", servers_table(&matches).render());
            println!();
            println!("Use exact name or ID to get details");
        }
    }
    Ok(())
}

fn argument_table(arguments: &[Argument]) -> Table {
    let mut table = Table::new(["TYPE", "NAME", "REQUIRED", "DEFAULT", "DESCRIPTION"]).indent(5);
    for arg in arguments {
        table.row([
            arg.kind.as_str().to_owned(),
            arg.name.clone(),
            yes_no(arg.input.is_required).to_owned(),
            arg.input.default.clone(),
            arg.input.description.clone(),
        ]);
    }
    table
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

pub fn render_server_detail(detail: &ServerDetail) -> String {
    let server = &detail.server;
    let mut out = String::new();

    let _ = writeln!(out, "Server Details");
    let _ = writeln!(out, "==============\n");
    let _ = writeln!(out, "ID:           {}", server.id);
    let _ = writeln!(out, "Name:         {}", server.name);
    let _ = writeln!(out, "Description:  {}", server.description);
    let _ = writeln!(out, "Version:      {}", server.version_detail.version);
    let _ = writeln!(out, "Release Date: {}", server.version_detail.release_date);
    let _ = writeln!(out, "Is Latest:    {}", server.version_detail.is_latest);

    let _ = writeln!(out, "\nRepository\n----------");
    let _ = writeln!(out, "URL:    {}", server.repository.url);
    let _ = writeln!(out, "Source: {}", server.repository.source);
    if !server.repository.id.is_empty() {
        let _ = writeln!(out, "ID:     {}", server.repository.id);
    }

    if !detail.packages.is_empty() {
        let _ = writeln!(out, "\nPackages\n--------");
        for (i, pkg) in detail.packages.iter().enumerate() {
            let _ = writeln!(out, "{}. {} ({})", i + 1, pkg.name, pkg.registry_name);
            let _ = writeln!(out, "   Version: {}", pkg.version);
            if let Some(hint) = pkg.runtime_hint.as_deref().filter(|h| !h.is_empty()) {
                let _ = writeln!(out, "   Runtime Hint: {hint}");
            }
            if !pkg.package_arguments.is_empty() {
                let _ = writeln!(out, "   Package Arguments:");
                out.push_str(&argument_table(&pkg.package_arguments).render());
            }
            if !pkg.runtime_arguments.is_empty() {
                let _ = writeln!(out, "   Runtime Arguments:");
                out.push_str(&argument_table(&pkg.runtime_arguments).render());
            }
            if !pkg.environment_variables.is_empty() {
                let _ = writeln!(out, "   Environment Variables:");
                let mut table = Table::new(["NAME", "REQUIRED", "DESCRIPTION"]).indent(5);
                for env in &pkg.environment_variables {
                    table.row([
                        env.name.clone(),
                        yes_no(env.input.is_required).to_owned(),
                        env.input.description.clone(),
                    ]);
                }
                out.push_str(&table.render());
            }
        }
    }

    if !detail.remotes.is_empty() {
        let _ = writeln!(out, "\nRemote Connections\n------------------");
        for (i, remote) in detail.remotes.iter().enumerate() {
            let _ = writeln!(out, "{}. Transport: {}", i + 1, remote.transport_type);
            let _ = writeln!(out, "   URL: {}", remote.url);
            if !remote.headers.is_empty() {
                let _ = writeln!(out, "   Headers:");
                for header in &remote.headers {
                    let _ = writeln!(out, "     {}: {}", header.value, header.description);
                }
            }
        }
    }

    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// health / ping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Print the registry's health. Returns `Ok(false)` when it is not `ok`.
pub async fn health<P: RegistryProvider>(registry: &P) -> anyhow::Result<bool> {
    let health = registry.health().await.context("health check failed")?;

    println!("Service Health Status");
    println!("=====================\n");
    println!("Status: {}", health.status);
    if !health.github_client_id.is_empty() {
        println!("GitHub Client ID: {}", health.github_client_id);
    }

    if health.is_ok() {
        println!("\nService is healthy and operational");
    } else {
        println!("\nService health check indicates issues");
    }
    Ok(health.is_ok())
}

pub async fn ping<P: RegistryProvider>(registry: &P) -> anyhow::Result<()> {
    let ping = registry.ping().await.context("ping failed")?;
    println!("Status:  {}", ping.status);
    if !ping.version.is_empty() {
        println!("Version: {}", ping.version);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::FakeRegistry;
    use mc_domain::registry::VersionDetail;

    /// In-memory registry that answers every listing with a single page.
    mod fake {
        use super::*;
        use mc_domain::error::{Error, Result};
        use mc_domain::registry::{HealthStatus, PageMetadata, PingStatus, ServersPage};

        pub struct FakeRegistry {
            pub servers: Vec<Server>,
        }

        #[async_trait::async_trait]
        impl RegistryProvider for FakeRegistry {
            async fn list_servers(&self, _cursor: Option<&str>, _limit: u32) -> Result<ServersPage> {
                Ok(ServersPage {
                    servers: self.servers.clone(),
                    metadata: PageMetadata::default(),
                })
            }

            async fn get_server(&self, id: &str) -> Result<ServerDetail> {
                self.servers
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| ServerDetail {
                        server: s.clone(),
                        ..ServerDetail::default()
                    })
                    .ok_or_else(|| Error::NotFound(format!("server {id}")))
            }

            async fn health(&self) -> Result<HealthStatus> {
                Ok(HealthStatus::default())
            }

            async fn ping(&self) -> Result<PingStatus> {
                Ok(PingStatus::default())
            }
        }
    }

    fn server(id: &str, name: &str) -> Server {
        Server {
            id: id.into(),
            name: name.into(),
            version_detail: VersionDetail {
                version: "1.0.0".into(),
                ..VersionDetail::default()
            },
            ..Server::default()
        }
    }

    fn registry() -> FakeRegistry {
        FakeRegistry {
            servers: vec![
                server("123e4567-e89b-12d3-a456-426614174000", "io.github.acme/redis"),
                server("223e4567-e89b-12d3-a456-426614174000", "io.github.acme/redis-cluster"),
                server("323e4567-e89b-12d3-a456-426614174000", "io.github.other/weather"),
            ],
        }
    }

    #[test]
    fn uuid_detection() {
        assert!(is_uuid("123e4567-e89b-12d3-a456-426614174000"));
        assert!(is_uuid("123E4567-E89B-12D3-A456-426614174000"));
        assert!(!is_uuid("123e4567e89b12d3a456426614174000"));
        assert!(!is_uuid("io.github.owner/server"));
        assert!(!is_uuid(" 123e4567-e89b-12d3-a456-426614174000"));
    }

    #[tokio::test]
    async fn uuid_is_fetched_by_id() {
        let found = lookup_server(&registry(), "323e4567-e89b-12d3-a456-426614174000", false, false)
            .await
            .unwrap();
        assert!(matches!(found, Lookup::Detail(d) if d.server.name == "io.github.other/weather"));
    }

    #[tokio::test]
    async fn exact_name_wins_over_pattern() {
        let found = lookup_server(&registry(), "io.github.acme/redis", false, false).await.unwrap();
        assert!(matches!(found, Lookup::Detail(d) if d.server.id.starts_with("123e")));
    }

    #[tokio::test]
    async fn single_pattern_match_is_expanded() {
        let found = lookup_server(&registry(), "WEATHER", false, false).await.unwrap();
        assert!(matches!(found, Lookup::Detail(d) if d.server.name == "io.github.other/weather"));
    }

    #[tokio::test]
    async fn several_pattern_matches_are_listed() {
        let found = lookup_server(&registry(), "acme", false, false).await.unwrap();
        match found {
            Lookup::Matches(m) => assert_eq!(m.len(), 2),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_match_is_an_error() {
        let err = lookup_server(&registry(), "nothing", false, false).await.unwrap_err();
        assert!(err.to_string().contains("no servers found matching 'nothing'"));
    }

    #[tokio::test]
    async fn show_matches_skips_exact_lookup() {
        let found = lookup_server(&registry(), "io.github.acme/redis", false, true).await.unwrap();
        match found {
            Lookup::Matches(m) => assert_eq!(m.len(), 2),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn servers_table_truncates_descriptions() {
        let mut s = server("id-1", "io.github.acme/redis");
        s.description = "d".repeat(80);
        let rendered = servers_table(&[s]).render();
        let row = rendered.lines().nth(2).unwrap();
        assert!(row.ends_with(&format!("{}...", "d".repeat(47))));
    }

    #[test]
    fn detail_lists_packages_and_remotes() {
        let detail: ServerDetail = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "name": "io.github.owner/redis",
            "packages": [{
                "registry_name": "npm",
                "name": "@owner/redis",
                "version": "1.2.0",
                "environment_variables": [{ "name": "REDIS_URL", "is_required": true, "description": "DSN" }]
            }],
            "remotes": [{ "transport_type": "sse", "url": "https://redis.example.com/sse" }]
        }))
        .unwrap();
        let out = render_server_detail(&detail);
        assert!(out.contains("1. @owner/redis (npm)"));
        assert!(out.contains("REDIS_URL  Yes"));
        assert!(out.contains("1. Transport: sse"));
    }
}
