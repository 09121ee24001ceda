//! Typed request builders.
//!
//! An [`EthRequest`] couples a logical call with the parser for its result,
//! so the client can hand back `R` instead of raw JSON.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::request::{JsonRpcResponse, RpcCall};

type Parser<R> = fn(Value) -> Result<R, TransportError>;

/// A logical call plus the function that turns its `result` into `R`.
#[derive(Debug, Clone)]
pub struct EthRequest<R> {
    pub call: RpcCall,
    parse: Parser<R>,
}

impl<R: DeserializeOwned> EthRequest<R> {
    /// Request whose result deserializes directly into `R`.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            call: RpcCall::new(method, params),
            parse: parse_json::<R>,
        }
    }
}

impl<R> EthRequest<R> {
    /// Request with a custom result parser.
    pub fn with_parser(method: impl Into<String>, params: Vec<Value>, parse: Parser<R>) -> Self {
        Self {
            call: RpcCall::new(method, params),
            parse,
        }
    }

    pub(crate) fn parser(&self) -> Parser<R> {
        self.parse
    }

    /// Check the response for a node error, then parse its result.
    pub fn parse_response(&self, resp: JsonRpcResponse) -> Result<R, TransportError> {
        finish(self.parse, resp)
    }
}

pub(crate) fn finish<R>(parse: Parser<R>, resp: JsonRpcResponse) -> Result<R, TransportError> {
    let result = resp.into_result().map_err(TransportError::Rpc)?;
    parse(result)
}

fn parse_json<R: DeserializeOwned>(v: Value) -> Result<R, TransportError> {
    Ok(serde_json::from_value(v)?)
}

/// Parse a JSON-RPC quantity: `"0x1b4"`, `"436"` or a bare number.
pub fn parse_quantity(v: Value) -> Result<u64, TransportError> {
    match &v {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| TransportError::Deserialization(format!("not a u64 quantity: {n}"))),
        Value::String(s) => {
            let parsed = match s.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse::<u64>(),
            };
            parsed.map_err(|e| TransportError::Deserialization(format!("bad quantity {s:?}: {e}")))
        }
        other => Err(TransportError::Deserialization(format!(
            "expected quantity, got {other}"
        ))),
    }
}

/// Block selector for block-scoped requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Number(u64),
    Latest,
    Pending,
}

impl BlockTag {
    fn to_param(self) -> Value {
        match self {
            Self::Number(n) => json!(format!("0x{n:x}")),
            Self::Latest => json!("latest"),
            Self::Pending => json!("pending"),
        }
    }
}

pub fn block_number() -> EthRequest<u64> {
    EthRequest::with_parser("eth_blockNumber", vec![], parse_quantity)
}

/// Chain ID, see EIP-695.
pub fn chain_id() -> EthRequest<u64> {
    EthRequest::with_parser("eth_chainId", vec![], parse_quantity)
}

pub fn net_version() -> EthRequest<u64> {
    EthRequest::with_parser("net_version", vec![], parse_quantity)
}

pub fn client_version() -> EthRequest<String> {
    EthRequest::new("web3_clientVersion", vec![])
}

/// Current price per gas in wei.
pub fn gas_price() -> EthRequest<u64> {
    EthRequest::with_parser("eth_gasPrice", vec![], parse_quantity)
}

pub fn peer_count() -> EthRequest<u64> {
    EthRequest::with_parser("net_peerCount", vec![], parse_quantity)
}

/// Full block with transaction objects, as raw JSON.
pub fn get_block(block: BlockTag) -> EthRequest<Value> {
    EthRequest::new("eth_getBlockByNumber", vec![block.to_param(), json!(true)])
}

pub fn get_transaction_receipt(tx_hash: &str) -> EthRequest<Option<Value>> {
    EthRequest::new("eth_getTransactionReceipt", vec![json!(tx_hash)])
}

/// Deployed bytecode as hex; `"0x"` for externally owned accounts.
pub fn get_code(address: &str) -> EthRequest<String> {
    EthRequest::new("eth_getCode", vec![json!(address), json!("latest")])
}

pub fn get_storage_at(address: &str, slot: &str) -> EthRequest<String> {
    let slot = with_hex_prefix(slot);
    EthRequest::new(
        "eth_getStorageAt",
        vec![json!(address), json!(slot), json!("latest")],
    )
}

/// `eth_call` against `latest`; `data` is call data with or without `0x`.
/// Returns the raw hex result.
pub fn call(to: &str, data: &str) -> EthRequest<String> {
    let data = with_hex_prefix(data);
    EthRequest::new(
        "eth_call",
        vec![json!({ "to": to, "data": data }), json!("latest")],
    )
}

fn with_hex_prefix(s: &str) -> String {
    if s.starts_with("0x") {
        s.to_string()
    } else {
        format!("0x{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{JsonRpcError, RpcId};

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity(json!("0x1b4")).unwrap(), 436);
        assert_eq!(parse_quantity(json!("1")).unwrap(), 1);
        assert_eq!(parse_quantity(json!(42)).unwrap(), 42);
        assert!(parse_quantity(json!(null)).is_err());
    }

    #[test]
    fn call_prefixes_data() {
        let req = call("0xabc", "06fdde03");
        assert_eq!(req.call.method, "eth_call");
        assert_eq!(req.call.params[0]["data"], "0x06fdde03");
        assert_eq!(req.call.params[1], "latest");
    }

    #[test]
    fn storage_slot_prefixed() {
        let req = get_storage_at("0xabc", "0x0");
        assert_eq!(req.call.params[1], "0x0");
        let req = get_storage_at("0xabc", "360894a1");
        assert_eq!(req.call.params[1], "0x360894a1");
    }

    #[test]
    fn block_tag_params() {
        let req = get_block(BlockTag::Number(255));
        assert_eq!(req.call.params[0], "0xff");
        assert_eq!(req.call.params[1], true);
    }

    #[test]
    fn node_error_is_surfaced() {
        let resp = JsonRpcResponse::failure(
            RpcId::Number(1),
            JsonRpcError {
                code: -32000,
                message: "execution reverted".into(),
                data: None,
            },
        );
        let err = block_number().parse_response(resp).unwrap_err();
        assert!(err.is_execution_error());
    }
}
