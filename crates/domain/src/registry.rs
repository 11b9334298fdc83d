//! DTOs for the MCP Registry Service (`/v0/...` endpoints).
//!
//! Field names follow the service's snake_case JSON. Every optional field
//! carries `#[serde(default)]` so partially populated records still parse.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Servers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Summary record returned by `GET /v0/servers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub version_detail: VersionDetail,
}

/// Full record returned by `GET /v0/servers/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerDetail {
    #[serde(flatten)]
    pub server: Server,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remotes: Vec<Remote>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VersionDetail {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub is_latest: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Packages & remotes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An installable distribution of a server (npm, pypi, docker, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub registry_name: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runtime_arguments: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_arguments: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<KeyValueInput>,
}

/// A hosted endpoint for a server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Remote {
    pub transport_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Input>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inputs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    String,
    Number,
    Boolean,
    FilePath,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentType {
    #[default]
    Positional,
    Named,
}

impl ArgumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentType::Positional => "positional",
            ArgumentType::Named => "named",
        }
    }
}

/// A user-supplied value description.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Input {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub default: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, Input>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, Input>,
}

/// A named environment variable input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeyValueInput {
    pub name: String,
    #[serde(flatten)]
    pub input: Input,
}

/// A runtime or package argument.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Argument {
    #[serde(rename = "type", default)]
    pub kind: ArgumentType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_repeated: bool,
    #[serde(default)]
    pub value_hint: String,
    #[serde(flatten)]
    pub input: Input,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelopes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One page of `GET /v0/servers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServersPage {
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub metadata: PageMetadata,
}

/// Pagination metadata. `next_cursor` is an opaque token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total: u64,
}

impl PageMetadata {
    /// The cursor for the following page, ignoring empty strings.
    pub fn next(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub github_client_id: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PingStatus {
    pub status: String,
    #[serde(default)]
    pub version: String,
}

impl PingStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_detail_flattens_summary_fields() {
        let raw = r#"{
            "id": "a1",
            "name": "io.github.owner/redis",
            "description": "Redis tools",
            "repository": { "url": "https://github.com/owner/redis", "source": "github" },
            "version_detail": { "version": "1.2.0", "release_date": "2025-01-01", "is_latest": true },
            "packages": [{
                "registry_name": "npm",
                "name": "@owner/redis",
                "version": "1.2.0",
                "package_arguments": [
                    { "type": "named", "name": "--port", "is_required": true, "default": "6379" }
                ],
                "environment_variables": [
                    { "name": "REDIS_URL", "description": "Connection string", "is_required": true }
                ]
            }],
            "remotes": [{ "transport_type": "sse", "url": "https://redis.example.com/sse" }]
        }"#;
        let detail: ServerDetail = serde_json::from_str(raw).unwrap();
        assert_eq!(detail.server.id, "a1");
        assert_eq!(detail.server.version_detail.version, "1.2.0");
        assert!(detail.server.version_detail.is_latest);

        let pkg = &detail.packages[0];
        assert_eq!(pkg.package_arguments[0].kind, ArgumentType::Named);
        assert!(pkg.package_arguments[0].input.is_required);
        assert_eq!(pkg.package_arguments[0].input.default, "6379");
        assert_eq!(pkg.environment_variables[0].name, "REDIS_URL");
        assert_eq!(detail.remotes[0].transport_type, "sse");
    }

    #[test]
    fn empty_next_cursor_means_last_page() {
        let page: ServersPage =
            serde_json::from_str(r#"{ "servers": [], "metadata": { "next_cursor": "" } }"#).unwrap();
        assert_eq!(page.metadata.next(), None);

        let page: ServersPage =
            serde_json::from_str(r#"{ "servers": [], "metadata": { "next_cursor": "abc" } }"#).unwrap();
        assert_eq!(page.metadata.next(), Some("abc"));
    }

    #[test]
    fn missing_metadata_defaults() {
        let page: ServersPage = serde_json::from_str(r#"{ "servers": [] }"#).unwrap();
        assert_eq!(page.metadata.count, 0);
        assert!(page.metadata.next().is_none());
    }
}
