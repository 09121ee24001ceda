//! The public RPC call surface.
//!
//! `RpcClient` runs in one of two modes:
//!
//! - **direct**: `request` sends one physical call per logical call
//! - **queued**: `request` enqueues the call; a background flush task groups
//!   everything arriving within `max_batch_time` (or until `max_batch_size`
//!   is reached) into one batch and hands it to the [`BatchExecutor`]
//!
//! `request_batch` always goes through the batch engine, in both modes.
//!
//! # Usage
//! ```rust,no_run
//! use evmdecoder_rpc::{requests, AbortHandle, BatchConfig, HttpTransport, QueueConfig, RpcClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), evmdecoder_rpc::TransportError> {
//! let transport = Arc::new(HttpTransport::default_for("https://rpc.example.com")?);
//! let queue = QueueConfig { max_batch_size: 100, max_batch_time: Duration::from_millis(5) };
//! let client = RpcClient::queued(transport, BatchConfig::default(), queue, AbortHandle::new())?;
//! let code = client.request(requests::get_code("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time;

use crate::abort::AbortHandle;
use crate::batch::{BatchConfig, BatchExecutor, BatchItem, BatchResult};
use crate::error::TransportError;
use crate::request::{JsonRpcResponse, RpcCall};
use crate::requests::{finish, EthRequest};
use crate::transport::RpcTransport;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Bypass the queue and send one physical call right away.
    pub immediate: bool,
}

/// Flush thresholds for the queued mode.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Flush as soon as this many calls are queued.
    pub max_batch_size: usize,
    /// Flush this long after the first call of an epoch was queued.
    pub max_batch_time: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            max_batch_time: Duration::ZERO,
        }
    }
}

/// JSON-RPC client over a shared transport.
pub struct RpcClient {
    executor: Arc<BatchExecutor>,
    queue: Option<mpsc::UnboundedSender<BatchItem>>,
    abort: AbortHandle,
}

impl RpcClient {
    /// Client that sends single calls directly.
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        batch: BatchConfig,
        abort: AbortHandle,
    ) -> Result<Self, TransportError> {
        let executor = Arc::new(BatchExecutor::new(transport, batch, abort.clone())?);
        Ok(Self {
            executor,
            queue: None,
            abort,
        })
    }

    /// Client that coalesces single calls into batches.
    ///
    /// Spawns the flush task, so it must be called inside a Tokio runtime.
    pub fn queued(
        transport: Arc<dyn RpcTransport>,
        batch: BatchConfig,
        queue: QueueConfig,
        abort: AbortHandle,
    ) -> Result<Self, TransportError> {
        if queue.max_batch_size < 1 {
            return Err(TransportError::Config(
                "max batch size can't be less than 1".into(),
            ));
        }
        let executor = Arc::new(BatchExecutor::new(transport, batch, abort.clone())?);
        let (tx, rx) = mpsc::unbounded_channel::<BatchItem>();

        let flush_executor = executor.clone();
        let flush_abort = abort.clone();
        tokio::spawn(async move {
            flush_loop(rx, flush_executor, queue, flush_abort).await;
        });

        Ok(Self {
            executor,
            queue: Some(tx),
            abort,
        })
    }

    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    pub fn is_queued(&self) -> bool {
        self.queue.is_some()
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        self.executor.transport()
    }

    /// Issue one logical call and parse its result.
    pub async fn request<R>(&self, req: EthRequest<R>) -> Result<R, TransportError> {
        self.request_with(req, RequestOptions::default()).await
    }

    /// Issue one logical call with explicit options and parse its result.
    pub async fn request_with<R>(
        &self,
        req: EthRequest<R>,
        opts: RequestOptions,
    ) -> Result<R, TransportError> {
        let parse = req.parser();
        let resp = self.dispatch(req.call, opts.immediate).await.map_err(|e| {
            tracing::debug!(error = %e, "JSON-RPC request failed");
            e
        })?;
        finish(parse, resp)
    }

    /// Issue one logical call and return the response uninterpreted.
    ///
    /// A JSON-RPC `error` carried by the response is not turned into an
    /// `Err`; transport, abort and protocol failures still are.
    pub async fn request_raw(
        &self,
        call: RpcCall,
        opts: RequestOptions,
    ) -> Result<JsonRpcResponse, TransportError> {
        self.dispatch(call, opts.immediate).await
    }

    /// Issue many logical calls as one cooperative batch.
    ///
    /// Output order matches input order regardless of dedup, splitting or
    /// retries. Fails with the first failing call's error.
    pub async fn request_batch<R>(&self, reqs: Vec<EthRequest<R>>) -> Result<Vec<R>, TransportError> {
        let mut parsers = Vec::with_capacity(reqs.len());
        let mut items = Vec::with_capacity(reqs.len());
        let mut receivers = Vec::with_capacity(reqs.len());
        for req in reqs {
            parsers.push(req.parser());
            let (item, rx) = BatchItem::new(req.call);
            items.push(item);
            receivers.push(rx);
        }

        // Let concurrently issued work get scheduled before we occupy the transport.
        tokio::task::yield_now().await;
        self.executor.execute(items).await;

        let mut results = Vec::with_capacity(receivers.len());
        for (parse, rx) in parsers.into_iter().zip(receivers) {
            let resp = await_completion(rx).await?;
            results.push(finish(parse, resp)?);
        }
        Ok(results)
    }

    async fn dispatch(&self, call: RpcCall, immediate: bool) -> Result<JsonRpcResponse, TransportError> {
        match &self.queue {
            Some(queue) if !immediate => {
                if self.abort.is_aborted() {
                    return Err(TransportError::Aborted);
                }
                let (item, rx) = BatchItem::new(call);
                queue.send(item).map_err(|_| TransportError::Aborted)?;
                await_completion(rx).await
            }
            _ => self.send_direct(call).await,
        }
    }

    async fn send_direct(&self, call: RpcCall) -> Result<JsonRpcResponse, TransportError> {
        if self.abort.is_aborted() {
            return Err(TransportError::Aborted);
        }
        let req = call.to_request();
        let expected = req.id.clone();
        let resp = self.executor.transport().send(req).await?;
        // Nodes answer some failures with `"id": null`; the error wins.
        if resp.error.is_none() && resp.id != expected {
            return Err(TransportError::IdMismatch {
                expected,
                got: resp.id,
            });
        }
        Ok(resp)
    }
}

async fn await_completion(rx: oneshot::Receiver<BatchResult>) -> Result<JsonRpcResponse, TransportError> {
    // A dropped completion means the flush task went away on abort.
    rx.await.map_err(|_| TransportError::Aborted)?
}

/// Collect queued items into batches and hand each batch to the executor.
///
/// A batch epoch starts with the first item and ends when it holds
/// `max_batch_size` items or `max_batch_time` has passed, whichever comes
/// first. The batch is moved out before execution starts, so calls arriving
/// meanwhile open the next epoch.
async fn flush_loop(
    mut rx: mpsc::UnboundedReceiver<BatchItem>,
    executor: Arc<BatchExecutor>,
    config: QueueConfig,
    abort: AbortHandle,
) {
    loop {
        // Wait for the first item
        let first = tokio::select! {
            biased;
            _ = abort.aborted() => break,
            item = rx.recv() => match item {
                Some(i) => i,
                None => return, // client dropped
            },
        };

        let mut batch = vec![first];

        // Take whatever is already queued
        while batch.len() < config.max_batch_size {
            match rx.try_recv() {
                Ok(item) => batch.push(item),
                Err(_) => break,
            }
        }

        // Collect everything that arrives within the window
        if batch.len() < config.max_batch_size && !config.max_batch_time.is_zero() {
            let deadline = time::sleep(config.max_batch_time);
            tokio::pin!(deadline);

            while batch.len() < config.max_batch_size {
                tokio::select! {
                    _ = abort.aborted() => break,
                    _ = &mut deadline => break,
                    item = rx.recv() => match item {
                        Some(i) => batch.push(i),
                        None => break,
                    },
                }
            }
        }

        tracing::trace!(size = batch.len(), "flushing request queue");
        let executor = executor.clone();
        tokio::spawn(async move {
            executor.execute(batch).await;
        });
    }

    rx.close();
    while let Ok(item) = rx.try_recv() {
        item.complete(Err(TransportError::Aborted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::request::{JsonRpcError, JsonRpcRequest, RpcId};
    use crate::requests;
    use async_trait::async_trait;
    use futures::future::join_all;
    use serde_json::{json, Value};

    fn code_transport() -> Arc<MockTransport> {
        Arc::new(MockTransport::new(|method, params| match method {
            "eth_getCode" => Ok(json!(format!("0xc0de{}", params[0].as_str().unwrap_or("")))),
            "eth_blockNumber" => Ok(json!("0x10")),
            _ => Err(JsonRpcError {
                code: -32601,
                message: "method not found".into(),
                data: None,
            }),
        }))
    }

    #[tokio::test]
    async fn batch_preserves_input_order_with_duplicates() {
        let transport = code_transport();
        let client = RpcClient::new(transport.clone(), BatchConfig::default(), AbortHandle::new()).unwrap();
        let reqs = vec![
            requests::get_code("aa"),
            requests::get_code("bb"),
            requests::get_code("aa"),
            requests::get_code("cc"),
        ];
        let codes = client.request_batch(reqs).await.unwrap();
        assert_eq!(codes, vec!["0xc0deaa", "0xc0debb", "0xc0deaa", "0xc0decc"]);
        assert_eq!(transport.batch_sizes(), vec![3]);
    }

    #[tokio::test]
    async fn node_errors_surface_as_rpc_errors() {
        let client = RpcClient::new(code_transport(), BatchConfig::default(), AbortHandle::new()).unwrap();
        let err = client
            .request(EthRequest::<Value>::new("eth_unknown", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rpc(ref e) if e.code == -32601));

        let raw = client
            .request_raw(RpcCall::new("eth_unknown", vec![]), RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(raw.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn queued_calls_coalesce_into_one_batch() {
        let transport = code_transport();
        let queue = QueueConfig {
            max_batch_size: 100,
            max_batch_time: Duration::from_millis(20),
        };
        let client =
            RpcClient::queued(transport.clone(), BatchConfig::default(), queue, AbortHandle::new()).unwrap();

        let calls = (0..5).map(|i| client.request(requests::get_code(&format!("{i}"))));
        let codes: Vec<String> = join_all(calls)
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(codes[3], "0xc0de3");
        assert_eq!(transport.batch_sizes(), vec![5]);
        assert_eq!(transport.single_sends(), 0);
    }

    #[tokio::test]
    async fn queue_flushes_when_full() {
        let transport = code_transport();
        let queue = QueueConfig {
            max_batch_size: 2,
            max_batch_time: Duration::from_secs(3600),
        };
        let client =
            RpcClient::queued(transport.clone(), BatchConfig::default(), queue, AbortHandle::new()).unwrap();

        let calls = (0..4).map(|i| client.request(requests::get_code(&format!("{i}"))));
        let results = join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.batch_sizes(), vec![2, 2]);
    }

    #[tokio::test]
    async fn immediate_bypasses_queue() {
        let transport = code_transport();
        let client = RpcClient::queued(
            transport.clone(),
            BatchConfig::default(),
            QueueConfig::default(),
            AbortHandle::new(),
        )
        .unwrap();
        let block = client
            .request_with(requests::block_number(), RequestOptions { immediate: true })
            .await
            .unwrap();
        assert_eq!(block, 16);
        assert_eq!(transport.single_sends(), 1);
        assert!(transport.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn abort_fails_queued_calls() {
        let queue = QueueConfig {
            max_batch_size: 100,
            max_batch_time: Duration::from_secs(3600),
        };
        let abort = AbortHandle::new();
        let client = RpcClient::queued(code_transport(), BatchConfig::default(), queue, abort.clone()).unwrap();

        let pending = client.request(requests::get_code("aa"));
        let aborter = async {
            tokio::task::yield_now().await;
            abort.abort();
        };
        let (result, _) = tokio::join!(pending, aborter);
        assert!(matches!(result, Err(TransportError::Aborted)));
    }

    struct WrongId;

    #[async_trait]
    impl RpcTransport for WrongId {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            let id = req.id.as_u64().unwrap_or(0) + 1;
            Ok(JsonRpcResponse::success(RpcId::Number(id), json!("0x1")))
        }

        fn url(&self) -> &str {
            "wrong-id://"
        }
    }

    #[tokio::test]
    async fn id_mismatch_is_fatal() {
        let client = RpcClient::new(Arc::new(WrongId), BatchConfig::default(), AbortHandle::new()).unwrap();
        let err = client.request(requests::block_number()).await.unwrap_err();
        assert!(matches!(err, TransportError::IdMismatch { .. }));
    }

    struct NullIdError;

    #[async_trait]
    impl RpcTransport for NullIdError {
        async fn send(&self, _req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            Ok(JsonRpcResponse::failure(
                RpcId::Null,
                JsonRpcError {
                    code: -32700,
                    message: "parse error".into(),
                    data: None,
                },
            ))
        }

        fn url(&self) -> &str {
            "null-id://"
        }
    }

    #[tokio::test]
    async fn error_with_null_id_is_a_node_error() {
        let client = RpcClient::new(Arc::new(NullIdError), BatchConfig::default(), AbortHandle::new()).unwrap();
        let err = client.request(requests::block_number()).await.unwrap_err();
        assert!(matches!(err, TransportError::Rpc(ref e) if e.code == -32700));

        let raw = client
            .request_raw(RpcCall::new("eth_blockNumber", vec![]), RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(raw.error.unwrap().message, "parse error");
    }
}
