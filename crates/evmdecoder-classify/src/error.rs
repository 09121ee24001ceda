use evmdecoder_rpc::TransportError;
use thiserror::Error;

/// Errors raised while probing or decoding contract state.
///
/// Classification itself never fails on these; they surface from the
/// lower-level helpers and are logged and swallowed by [`crate::Classifier`].
#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("ABI decode error: {0}")]
    Decode(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),
}

impl From<hex::FromHexError> for ClassifyError {
    fn from(e: hex::FromHexError) -> Self {
        ClassifyError::InvalidHex(e.to_string())
    }
}
