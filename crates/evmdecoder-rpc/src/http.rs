//! HTTP JSON-RPC transport backed by `reqwest`.
//!
//! Single calls are posted as JSON objects, batches as JSON arrays. The only
//! policy applied here is the per-request timeout; retries and splitting
//! live in the batch engine.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::RpcTransport;

/// Configuration for `HttpTransport`.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Time before failing a single HTTP call.
    pub request_timeout: Duration,
    /// Set to `false` to accept self-signed certificates.
    pub validate_certificate: bool,
    /// Maximum idle keep-alive connections per host.
    pub max_idle_per_host: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            validate_certificate: false,
            max_idle_per_host: 256,
        }
    }
}

/// HTTP JSON-RPC transport.
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a new transport for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpTransportConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.validate_certificate)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            request_timeout: config.request_timeout,
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpTransportConfig::default())
    }

    async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<Value, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| self.map_reqwest_error(e))
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            TransportError::Deserialization(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let body = self.post(&req).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// True HTTP batch: send all requests as a JSON array in one HTTP call.
    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        if reqs.is_empty() {
            return Ok(vec![]);
        }
        let body = self.post(&reqs).await?;
        parse_batch_body(body)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Interpret a batch response body.
///
/// Some nodes reject an oversized batch with a single error object instead of
/// an array; that is surfaced as an HTTP error so its message can drive splitting.
fn parse_batch_body(body: Value) -> Result<Vec<JsonRpcResponse>, TransportError> {
    match body {
        Value::Array(_) => Ok(serde_json::from_value(body)?),
        Value::Object(_) => {
            let single: JsonRpcResponse = serde_json::from_value(body)?;
            match single.error {
                Some(err) => Err(TransportError::Http(format!(
                    "batch rejected: {}",
                    err.message
                ))),
                None => Ok(vec![single]),
            }
        }
        other => Err(TransportError::Deserialization(format!(
            "unexpected batch response body: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_body_array() {
        let body = json!([
            {"jsonrpc": "2.0", "id": 2, "result": "0x2"},
            {"jsonrpc": "2.0", "id": 1, "result": "0x1"}
        ]);
        let parsed = parse_batch_body(body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id.as_u64(), Some(2));
    }

    #[test]
    fn batch_rejection_is_splittable() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {"code": -32600, "message": "batch too large"}
        });
        let err = parse_batch_body(body).unwrap_err();
        assert!(err.is_splittable());
    }

    #[test]
    fn transport_builds_with_defaults() {
        let transport = HttpTransport::default_for("http://localhost:8545").unwrap();
        assert_eq!(transport.url(), "http://localhost:8545");
    }
}
