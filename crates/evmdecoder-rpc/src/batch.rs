//! Batch execution engine.
//!
//! Takes a list of logical calls, each with its own completion channel, and
//! gets every one of them answered:
//!
//! 1. identical `(method, params)` pairs are collapsed into one physical request
//! 2. the unique requests are sent as one batch, retried with backoff
//! 3. payload-size failures split the batch into 2, 3, ... chunks
//! 4. responses are matched back by `id`, never by position
//! 5. calls the node silently dropped are re-sent one by one, a few times
//!
//! The engine never returns a value itself; results arrive on each item's
//! `oneshot` receiver in whatever order the work completes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::oneshot;

use crate::abort::AbortHandle;
use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse, RpcCall};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::transport::RpcTransport;

pub type BatchResult = Result<JsonRpcResponse, TransportError>;

/// One logical call waiting for its response.
#[derive(Debug)]
pub struct BatchItem {
    pub call: RpcCall,
    completion: oneshot::Sender<BatchResult>,
}

impl BatchItem {
    pub fn new(call: RpcCall) -> (Self, oneshot::Receiver<BatchResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                call,
                completion: tx,
            },
            rx,
        )
    }

    pub(crate) fn complete(self, result: BatchResult) {
        // The caller may have given up waiting.
        let _ = self.completion.send(result);
    }
}

/// Configuration for `BatchExecutor`.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Retry policy for submitting the whole batch.
    pub retry: RetryConfig,
    /// Ceiling for the split factor on payload-size failures.
    pub max_splits: usize,
    /// Rounds of individual re-requests for calls missing from a batch response.
    pub max_missing_attempts: u32,
    /// Concurrent single requests while recovering missing results.
    pub individual_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            max_splits: 10,
            max_missing_attempts: 5,
            individual_concurrency: 5,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.max_splits < 1 {
            return Err(TransportError::Config(
                "max batch splits can't be less than 1".into(),
            ));
        }
        if self.individual_concurrency < 1 {
            return Err(TransportError::Config(
                "individual request concurrency can't be less than 1".into(),
            ));
        }
        if self.retry.max_attempts < 1 {
            return Err(TransportError::Config(
                "retry attempts can't be less than 1".into(),
            ));
        }
        Ok(())
    }
}

/// Split `reqs` into `splits` equal-size chunks (the last may be shorter).
///
/// Fails fast when `splits` is below 1 or above `max_splits`.
pub fn chunk_requests<T: Clone>(
    reqs: &[T],
    splits: usize,
    max_splits: usize,
) -> Result<Vec<Vec<T>>, TransportError> {
    if splits < 1 {
        return Err(TransportError::Config(
            "batch request splits can't be less than 1".into(),
        ));
    }
    if splits > max_splits {
        return Err(TransportError::TooManySplits { max: max_splits });
    }
    let chunk_size = reqs.len().div_ceil(splits).max(1);
    Ok(reqs.chunks(chunk_size).map(<[T]>::to_vec).collect())
}

/// An original submission, in submission order, with its dedup key.
struct Submitted {
    key: String,
    item: BatchItem,
}

/// Executes batches of logical calls against a transport.
pub struct BatchExecutor {
    transport: Arc<dyn RpcTransport>,
    retry: RetryPolicy,
    config: BatchConfig,
    abort: AbortHandle,
}

impl BatchExecutor {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        config: BatchConfig,
        abort: AbortHandle,
    ) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self {
            transport,
            retry: RetryPolicy::new(config.retry.clone()),
            config,
            abort,
        })
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    /// Execute `batch`, resolving every item's completion.
    pub async fn execute(&self, batch: Vec<BatchItem>) {
        if batch.is_empty() {
            return;
        }
        if self.abort.is_aborted() {
            for item in batch {
                item.complete(Err(TransportError::Aborted));
            }
            return;
        }
        tracing::debug!(size = batch.len(), "processing batch of JSON-RPC requests");

        let mut order = Vec::with_capacity(batch.len());
        let mut pending: HashMap<u64, JsonRpcRequest> = HashMap::new();
        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        for item in batch {
            let key = item.call.dedup_key();
            if seen.insert(key.clone()) {
                let req = item.call.to_request();
                if let Some(id) = req.id.as_u64() {
                    pending.insert(id, req.clone());
                }
                unique.push(req);
            }
            order.push(Submitted { key, item });
        }
        if unique.len() < order.len() {
            tracing::debug!(
                submitted = order.len(),
                unique = unique.len(),
                "deduplicated batch requests"
            );
        }

        match self.submit_with_retry(&unique).await {
            Ok(responses) => self.reconcile(responses, pending, order).await,
            Err(e) => {
                tracing::warn!(error = %e, size = order.len(), "batch request failed");
                for submitted in order {
                    submitted.item.complete(Err(e.clone()));
                }
            }
        }
    }

    /// Send the unique requests, retrying the whole batch with backoff.
    async fn submit_with_retry(
        &self,
        reqs: &[JsonRpcRequest],
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_with_splits(reqs).await {
                Ok(responses) => return Ok(responses),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            url = %self.transport.url(),
                            "retrying batch request"
                        );
                        self.abort.sleep(delay).await?;
                    }
                    None => {
                        tracing::error!(
                            attempt,
                            error = %e,
                            url = %self.transport.url(),
                            "max batch retries exceeded"
                        );
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Send `reqs` as one batch; on payload-size failures resend it as 2, 3, ...
    /// chunks until `max_splits` is exceeded.
    async fn send_with_splits(
        &self,
        reqs: &[JsonRpcRequest],
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let mut splits = 1usize;
        loop {
            let chunks = chunk_requests(reqs, splits, self.config.max_splits)?;
            if splits > 1 {
                tracing::warn!(splits, chunks = chunks.len(), "splitting batch into chunks");
            }
            match self.send_chunks(chunks).await {
                Ok(responses) => return Ok(responses),
                Err(e) if e.is_splittable() => {
                    tracing::info!(error = %e, splits, "batch request error");
                    splits += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_chunks(
        &self,
        chunks: Vec<Vec<JsonRpcRequest>>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let mut responses = Vec::new();
        for chunk in chunks {
            responses.extend(self.transport.send_batch(chunk).await?);
        }
        Ok(responses)
    }

    /// Match responses to submissions and fan them out; re-request anything
    /// missing individually, one round at a time.
    async fn reconcile(
        &self,
        mut responses: Vec<JsonRpcResponse>,
        mut pending: HashMap<u64, JsonRpcRequest>,
        mut order: Vec<Submitted>,
    ) {
        let mut attempt = 1u32;
        loop {
            let mut by_key: HashMap<String, JsonRpcResponse> = HashMap::new();
            for resp in responses.drain(..) {
                match resp.id.as_u64().and_then(|id| pending.remove(&id)) {
                    Some(req) => {
                        by_key.insert(req.dedup_key(), resp);
                    }
                    None => tracing::error!(id = %resp.id, "found unassociated item in batch response"),
                }
            }
            if !pending.is_empty() {
                tracing::debug!(count = pending.len(), "unanswered requests after receiving results");
            }

            let mut missing = Vec::new();
            for submitted in order.drain(..) {
                match by_key.get(&submitted.key) {
                    Some(resp) => submitted.item.complete(Ok(resp.clone())),
                    None => missing.push(submitted),
                }
            }
            if missing.is_empty() {
                return;
            }

            if self.abort.is_aborted() {
                for submitted in missing {
                    submitted.item.complete(Err(TransportError::Aborted));
                }
                return;
            }
            if attempt > self.config.max_missing_attempts {
                tracing::error!(count = missing.len(), "results missing from batch response");
                for submitted in missing {
                    submitted.item.complete(Err(TransportError::MissingResult));
                }
                return;
            }

            tracing::warn!(attempt, count = missing.len(), "re-requesting missing batch items individually");
            pending.clear();
            let mut requests = Vec::new();
            let mut seen = HashSet::new();
            for submitted in &missing {
                if seen.insert(submitted.key.clone()) {
                    let req = submitted.item.call.to_request();
                    if let Some(id) = req.id.as_u64() {
                        pending.insert(id, req.clone());
                    }
                    requests.push(req);
                }
            }
            responses = self.send_individually(requests).await;
            order = missing;
            attempt += 1;
        }
    }

    /// One request per HTTP call, `individual_concurrency` at a time. Failed
    /// sends are left out and stay missing for the next round.
    async fn send_individually(&self, reqs: Vec<JsonRpcRequest>) -> Vec<JsonRpcResponse> {
        stream::iter(reqs)
            .map(|req| self.transport.send(req))
            .buffer_unordered(self.config.individual_concurrency)
            .filter_map(|result| async move {
                result
                    .map_err(|e| tracing::warn!(error = %e, "individual request failed"))
                    .ok()
            })
            .collect()
            .await
    }
}
