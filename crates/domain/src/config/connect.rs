use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// `connect` command defaults
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Overall deadline for `connect`, including process startup.
    #[serde(default = "d_60")]
    pub timeout_secs: u64,
    /// Transport used when `--type` is not given (`stdio`, `http`, `streamable`).
    #[serde(default = "d_transport")]
    pub transport: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            transport: d_transport(),
        }
    }
}

fn d_60() -> u64 {
    60
}
fn d_transport() -> String {
    "stdio".into()
}
