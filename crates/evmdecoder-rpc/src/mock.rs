//! Scripted in-memory transport for tests.
//!
//! Answers every request from a handler closure and records each physical
//! send, so tests can assert on batching, splitting and dedup behaviour
//! without a node.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::transport::RpcTransport;

type Handler = Box<dyn Fn(&str, &[Value]) -> Result<Value, JsonRpcError> + Send + Sync>;
type DropFilter = Box<dyn Fn(&JsonRpcRequest) -> bool + Send + Sync>;

#[derive(Default)]
struct Recorded {
    batches: Vec<Vec<JsonRpcRequest>>,
    singles: Vec<JsonRpcRequest>,
}

/// In-memory `RpcTransport`.
pub struct MockTransport {
    handler: Handler,
    batch_limit: Option<usize>,
    batch_failures: Mutex<VecDeque<TransportError>>,
    drop_from_batches: Option<DropFilter>,
    fail_singles: bool,
    reversed: bool,
    recorded: Mutex<Recorded>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&str, &[Value]) -> Result<Value, JsonRpcError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            batch_limit: None,
            batch_failures: Mutex::new(VecDeque::new()),
            drop_from_batches: None,
            fail_singles: false,
            reversed: false,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Reject batches with more than `max` requests as "too large".
    pub fn with_batch_limit(mut self, max: usize) -> Self {
        self.batch_limit = Some(max);
        self
    }

    /// Fail the next `send_batch` calls with these errors, in order.
    pub fn with_batch_failures(self, errors: Vec<TransportError>) -> Self {
        *self.batch_failures.lock().unwrap() = errors.into();
        self
    }

    /// Leave matching requests out of batch responses.
    pub fn dropping_from_batches(
        mut self,
        filter: impl Fn(&JsonRpcRequest) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.drop_from_batches = Some(Box::new(filter));
        self
    }

    /// Fail every single (non-batch) send.
    pub fn failing_singles(mut self) -> Self {
        self.fail_singles = true;
        self
    }

    /// Return batch responses in reverse order.
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Size of every `send_batch` call, including failed ones.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.recorded
            .lock()
            .unwrap()
            .batches
            .iter()
            .map(Vec::len)
            .collect()
    }

    pub fn single_sends(&self) -> usize {
        self.recorded.lock().unwrap().singles.len()
    }

    /// Physical requests for `method` across batches and single sends.
    pub fn count_method(&self, method: &str) -> usize {
        let recorded = self.recorded.lock().unwrap();
        recorded
            .batches
            .iter()
            .flatten()
            .chain(recorded.singles.iter())
            .filter(|r| r.method == method)
            .count()
    }

    /// Physical requests for `method` whose first param equals `first_param`.
    pub fn count_calls(&self, method: &str, first_param: &Value) -> usize {
        let recorded = self.recorded.lock().unwrap();
        recorded
            .batches
            .iter()
            .flatten()
            .chain(recorded.singles.iter())
            .filter(|r| r.method == method && r.params.first() == Some(first_param))
            .count()
    }

    fn answer(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        match (self.handler)(&req.method, &req.params) {
            Ok(result) => JsonRpcResponse::success(req.id.clone(), result),
            Err(error) => JsonRpcResponse::failure(req.id.clone(), error),
        }
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.recorded.lock().unwrap().singles.push(req.clone());
        tokio::task::yield_now().await;
        if self.fail_singles {
            return Err(TransportError::Http("connection refused".into()));
        }
        Ok(self.answer(&req))
    }

    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        self.recorded.lock().unwrap().batches.push(reqs.clone());
        tokio::task::yield_now().await;
        if let Some(err) = self.batch_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(limit) = self.batch_limit {
            if reqs.len() > limit {
                return Err(TransportError::Http(
                    "HTTP 413 Payload Too Large: request entity too large".into(),
                ));
            }
        }
        let mut responses: Vec<JsonRpcResponse> = reqs
            .iter()
            .filter(|req| !self.drop_from_batches.as_ref().is_some_and(|drop| drop(req)))
            .map(|req| self.answer(req))
            .collect();
        if self.reversed {
            responses.reverse();
        }
        Ok(responses)
    }

    fn url(&self) -> &str {
        "mock://"
    }
}
