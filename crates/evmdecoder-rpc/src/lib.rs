//! evmdecoder-rpc: batched JSON-RPC execution for evmdecoder.
//!
//! # Overview
//!
//! Everything evmdecoder learns about the chain flows through this crate:
//!
//! - [`RpcTransport`]: the async trait a wire transport implements
//! - [`HttpTransport`]: JSON-RPC over HTTP backed by `reqwest`
//! - [`BatchExecutor`]: dedup, adaptive splitting, retry and reconciliation
//!   of a batch of logical calls
//! - [`RpcClient`]: the public call surface, optionally coalescing single
//!   calls into batches (size- or time-triggered flush)
//! - [`requests`]: typed request builders (`eth_getCode`, `eth_call`, ...)
//! - [`AbortHandle`]: shared cancellation for backoff sleeps and queued calls

pub mod abort;
pub mod batch;
pub mod client;
pub mod error;
pub mod http;
pub mod request;
pub mod requests;
pub mod retry;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use abort::AbortHandle;
pub use batch::{BatchConfig, BatchExecutor, BatchItem};
pub use client::{QueueConfig, RequestOptions, RpcClient};
pub use error::TransportError;
pub use http::{HttpTransport, HttpTransportConfig};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcCall, RpcId};
pub use requests::EthRequest;
pub use retry::{Backoff, RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
