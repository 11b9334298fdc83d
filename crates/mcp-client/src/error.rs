use crate::adapter::TransportKind;
use crate::context::Interrupt;
use crate::transport::TransportError;

/// Errors surfaced by adapters and the adapter factory.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid adapter config: {0}")]
    InvalidConfig(String),

    #[error("unsupported adapter type: {0}")]
    UnsupportedKind(String),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected to server")]
    NotConnected,

    #[error("failed to open {kind} transport: {source}")]
    OpenFailed {
        kind: TransportKind,
        #[source]
        source: TransportError,
    },

    #[error("process exited unexpectedly, check command '{command}': {source}")]
    ProcessUnavailable {
        command: String,
        #[source]
        source: TransportError,
    },

    #[error("process not ready after {attempts} attempts: {last_error}")]
    ProcessNotReady { attempts: usize, last_error: String },

    #[error("failed to initialize: {0}")]
    HandshakeFailed(#[source] TransportError),

    #[error("failed to {operation} ({target}): {source}")]
    OperationFailed {
        operation: &'static str,
        target: String,
        #[source]
        source: TransportError,
    },

    #[error("{operation} interrupted: {reason}")]
    Cancelled { operation: &'static str, reason: Interrupt },

    #[error("failed to close transport: {0}")]
    Disconnect(#[source] TransportError),
}

impl AdapterError {
    /// True when the caller's context ended the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AdapterError::Cancelled { .. })
    }

    /// Map a failed capability call, keeping interrupts distinct.
    pub(crate) fn operation(operation: &'static str, target: impl Into<String>, source: TransportError) -> Self {
        match source {
            TransportError::Interrupted(reason) => AdapterError::Cancelled { operation, reason },
            source => AdapterError::OperationFailed {
                operation,
                target: target.into(),
                source,
            },
        }
    }
}
