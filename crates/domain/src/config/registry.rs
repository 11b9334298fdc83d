use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry service connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the MCP Registry Service.
    #[serde(default = "d_registry_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: d_registry_url(),
            timeout_ms: 30_000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_registry_url() -> String {
    "http://localhost:8080".into()
}
fn d_30000() -> u64 {
    30_000
}
