//! evmdecoder: contract info, classification and call decoding for
//! Ethereum-compatible chains.
//!
//! # Crates
//!
//! - `evmdecoder-rpc`: batched JSON-RPC execution (dedup, splitting, retry)
//! - `evmdecoder-classify`: bytecode fingerprints and contract classification
//! - `evmdecoder` (this crate): [`EvmDecoder`], the per-address
//!   [`ContractInfo`] cache, the ABI repository, configuration and logging

pub mod abi;
pub mod config;
pub mod contract_info;
pub mod decoder;
pub mod error;
pub mod observability;

pub use abi::{AbiRepository, FunctionCall, FunctionParam};
pub use config::Config;
pub use contract_info::{ContractInfo, ContractInfoService};
pub use decoder::EvmDecoder;
pub use error::{ConfigError, DecoderError};
pub use observability::{init_tracing, LogConfig};

pub use evmdecoder_classify as classify;
pub use evmdecoder_rpc as rpc;
