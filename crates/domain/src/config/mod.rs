mod connect;
mod registry;

pub use connect::*;
pub use registry::*;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "MCP_CLI_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "mcp-cli.toml";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub connect: ConnectConfig,
    /// Named server profiles (`[servers.<name>]`).
    ///
    /// Kept loosely typed: each table is handed to the adapter factory,
    /// which owns the coercion rules for `type`, `command`, `url`, etc.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerProfile>,
}

/// A weakly-typed server profile table.
pub type ServerProfile = serde_json::Map<String, serde_json::Value>;

impl Config {
    /// Parse a config from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse the config file at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Load the configuration from `MCP_CLI_CONFIG` (or `mcp-cli.toml`).
    ///
    /// A missing file is not an error: defaults are returned together with
    /// the path that was probed.
    pub fn load() -> Result<(Self, PathBuf)> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if path.exists() {
            let config = Self::from_path(&path)?;
            tracing::debug!(path = %path.display(), profiles = config.servers.len(), "loaded config");
            Ok((config, path))
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok((Self::default(), path))
        }
    }

    /// Look up a named server profile.
    pub fn profile(&self, name: &str) -> Option<&ServerProfile> {
        self.servers.get(name)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Profile tables are only checked for a `type` key here; the adapter
    /// factory performs the full per-transport validation when a profile is
    /// actually used.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let base_url = self.registry.base_url.trim();
        if base_url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "registry.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "registry.base_url".into(),
                message: "base_url must start with http:// or https://".into(),
            });
        }

        if self.registry.timeout_ms == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "registry.timeout_ms".into(),
                message: "timeout must be greater than 0".into(),
            });
        }

        if self.connect.timeout_secs == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "connect.timeout_secs".into(),
                message: "timeout must be greater than 0".into(),
            });
        }

        for (name, profile) in &self.servers {
            if !profile.get("type").is_some_and(|t| t.is_string()) {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: format!("servers.{name}.type"),
                    message: "profile must declare a string `type`".into(),
                });
            }
        }

        issues
    }
}
