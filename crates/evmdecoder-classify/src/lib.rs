//! evmdecoder-classify: bytecode fingerprinting and contract classification.
//!
//! # Overview
//!
//! - [`bytecode`]: PUSH4/PUSH32 scanning and order-independent fingerprints
//! - [`detect`]: named predicates over hex bytecode (tokens, proxies, multisigs)
//! - [`proxy`]: clone patterns and storage-word address extraction
//! - [`Classifier`]: folds predicates into a [`ContractType`], following
//!   proxy chains over RPC, and reads token/multisig properties
//! - [`codec`]: decoding of `eth_call` results

pub mod bytecode;
pub mod classifier;
pub mod codec;
pub mod detect;
pub mod error;
mod properties;
pub mod proxy;
pub mod signatures;
pub mod types;

pub use bytecode::{
    compute_fingerprint, extract_functions_and_events, ContractNameLookup, FunctionsAndEvents,
    SignatureMatcher,
};
pub use classifier::{Classifier, DEFAULT_MAX_PROXY_DEPTH};
pub use error::ClassifyError;
pub use types::{
    ContractKind, ContractProperties, ContractProxy, ContractType, Erc3668Properties,
    MultiSigProperties, Standard, TokenProperties,
};
