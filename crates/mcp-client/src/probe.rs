//! Readiness probing for freshly spawned server processes.
//!
//! A process is running before it is listening on stdin. Sending the real
//! handshake too early can block against a server still booting, or race
//! one that has already crashed. The prober sends a few cheap `ping`
//! requests first, with growing delays, and tells a dead process apart from
//! a slow one.

use std::io::ErrorKind;
use std::time::Duration;

use crate::adapter::AdapterConfig;
use crate::context::CallContext;
use crate::error::AdapterError;
use crate::session::Session;
use crate::transport::TransportError;

/// Lower-case substrings that mark an error as "the process is gone".
///
/// Heuristic fallback for errors that carry no structural signal. Checked
/// case-insensitively against the error's display text.
pub const PROCESS_EXIT_TOKENS: &[&str] = &["process", "exit", "pipe", "broken", "eof"];

/// Delays and per-attempt bound of the readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePolicy {
    /// Wait before each attempt; one attempt per entry.
    pub delays: Vec<Duration>,
    /// Bound on a single probe exchange.
    pub attempt_timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_millis(100),
                Duration::from_millis(500),
                Duration::from_secs(1),
            ],
            attempt_timeout: Duration::from_secs(1),
        }
    }
}

impl ProbePolicy {
    /// A policy that skips probing entirely.
    pub fn disabled() -> Self {
        Self {
            delays: Vec::new(),
            attempt_timeout: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }
}

/// Whether `err` shows that the server process has exited.
pub fn is_process_exit(err: &TransportError) -> bool {
    match err {
        TransportError::ProcessExited => true,
        TransportError::Io(io) if matches!(io.kind(), ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof) => true,
        // A JSON-RPC error is an answer from a live server.
        TransportError::Rpc(_) | TransportError::Interrupted(_) => false,
        other => {
            let text = other.to_string().to_ascii_lowercase();
            PROCESS_EXIT_TOKENS.iter().any(|token| text.contains(token))
        }
    }
}

/// Probe `session` until it answers, the process is found dead, or the
/// policy's attempts run out.
pub(crate) async fn wait_until_ready(
    session: &Session,
    ctx: &CallContext,
    policy: &ProbePolicy,
    config: &AdapterConfig,
) -> Result<(), AdapterError> {
    let attempts = policy.attempts();
    let mut last_error = None;

    for (index, delay) in policy.delays.iter().enumerate() {
        let attempt = index + 1;
        ctx.sleep(*delay).await.map_err(|reason| AdapterError::Cancelled {
            operation: "readiness probe",
            reason,
        })?;

        verbose!(config, attempt, attempts, "checking process readiness");
        let probe_ctx = ctx.with_timeout(policy.attempt_timeout);
        match session.ping(&probe_ctx).await {
            Ok(()) => {
                verbose!(config, attempt, "process is ready");
                return Ok(());
            }
            Err(err) => {
                if let Some(reason) = ctx.interrupted() {
                    return Err(AdapterError::Cancelled {
                        operation: "readiness probe",
                        reason,
                    });
                }
                if is_process_exit(&err) {
                    verbose!(config, attempt, error = %err, "process exited during readiness check");
                    return Err(AdapterError::ProcessUnavailable {
                        command: config.endpoint(),
                        source: err,
                    });
                }
                tracing::debug!(attempt, error = %err, "readiness probe failed");
                last_error = Some(err);
            }
        }
    }

    match last_error {
        Some(err) => Err(AdapterError::ProcessNotReady {
            attempts,
            last_error: err.to_string(),
        }),
        None => Ok(()),
    }
}
