//! Transport-level error types.

use thiserror::Error;

use crate::request::{JsonRpcError, RpcId};

/// Error text fragments that mean the node or a proxy in front of it choked
/// on the size of a batch. These drive batch splitting.
const SPLITTABLE_MARKERS: &[&str] = &["socket timeout", "too large", "too big"];

/// Errors that can occur while executing an RPC call.
///
/// `Clone` so a single failure can be handed to every caller sharing a
/// deduplicated physical request.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, bad status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The node answered a single call with a different `id`.
    #[error("JSON-RPC response ID mismatch: expected {expected} but got {got}")]
    IdMismatch { expected: RpcId, got: RpcId },

    /// A request was submitted in a batch but no response ever came back for it.
    #[error("Result missing from batch response")]
    MissingResult,

    /// Splitting the batch into ever smaller chunks did not help.
    #[error("Too many batch splits (max {max})")]
    TooManySplits { max: usize },

    /// Invalid batch engine configuration.
    #[error("Invalid batch configuration: {0}")]
    Config(String),

    /// The shared abort handle was tripped while the call was pending.
    #[error("Request aborted")]
    Aborted,

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if this error is transient and the batch may be resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout { .. } | Self::TooManySplits { .. }
        )
    }

    /// Returns `true` if the failure looks payload-size related, meaning the
    /// batch should be resubmitted in smaller chunks.
    pub fn is_splittable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(msg) | Self::Other(msg) => {
                let msg = msg.to_lowercase();
                SPLITTABLE_MARKERS.iter().any(|m| msg.contains(m))
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a node-side execution error.
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_errors_are_splittable() {
        assert!(TransportError::Http("HTTP 413 Payload Too Large: ".into()).is_splittable());
        assert!(TransportError::Http("Socket timeout".into()).is_splittable());
        assert!(TransportError::Other("response too big".into()).is_splittable());
        assert!(TransportError::Timeout { ms: 100 }.is_splittable());
        assert!(!TransportError::Http("connection refused".into()).is_splittable());
    }

    #[test]
    fn protocol_errors_are_not_retryable() {
        let mismatch = TransportError::IdMismatch {
            expected: RpcId::Number(1),
            got: RpcId::Number(2),
        };
        assert!(!mismatch.is_retryable());
        assert!(!TransportError::Deserialization("eof".into()).is_retryable());
        assert!(!TransportError::Aborted.is_retryable());
        assert!(TransportError::Http("connection reset".into()).is_retryable());
    }
}
