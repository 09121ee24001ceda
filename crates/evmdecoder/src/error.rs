use evmdecoder_classify::ClassifyError;
use evmdecoder_rpc::TransportError;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by [`crate::EvmDecoder`].
#[derive(Debug, Clone, Error)]
pub enum DecoderError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid ABI: {0}")]
    InvalidAbi(String),

    #[error("no ABI function matches selector 0x{selector}")]
    UnknownSelector { selector: String },

    #[error("call data too short: {len} bytes")]
    ShortInput { len: usize },

    #[error("ABI decode failed for {signature}: {reason}")]
    Decode { signature: String, reason: String },

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for DecoderError {
    fn from(e: hex::FromHexError) -> Self {
        DecoderError::InvalidHex(e.to_string())
    }
}
