//! In-memory ABI repository and function-call decoding.
//!
//! Registered ABIs are indexed by function selector and event topic. The
//! repository answers signature lookups for bytecode fingerprinting and
//! resolves contract names by address or by fingerprint.
//!
//! # How decoding works
//! - First 4 bytes of calldata = keccak256(function_signature)[:4] (the selector)
//! - Remaining bytes = ABI-encoded inputs, decoded as a parameter sequence

use std::collections::HashMap;

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_dyn_abi::Specifier;
use alloy_json_abi::{Function, JsonAbi, Param};
use evmdecoder_classify::{compute_fingerprint, ContractNameLookup, SignatureMatcher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecoderError;

/// A decoded function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Canonical signature, e.g. `"transfer(address,uint256)"`
    pub signature: String,
    pub params: Vec<FunctionParam>,
    /// Parameter name → value; omitted when any parameter is unnamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
    /// Contract-aware additions such as `tokenUri` on NFT transfers.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Value,
}

struct AbiEntry {
    name: String,
    fingerprint: Option<String>,
    functions: HashMap<String, Function>,
    signatures: HashMap<String, String>,
}

/// ABIs known to the decoder.
#[derive(Default)]
pub struct AbiRepository {
    entries: Vec<AbiEntry>,
    by_address: HashMap<String, usize>,
    by_fingerprint: HashMap<String, usize>,
    /// selector or topic → entries defining it, in registration order
    by_hash: HashMap<String, Vec<usize>>,
}

impl AbiRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a standard Ethereum ABI JSON document under `name`,
    /// optionally bound to a deployed `address`.
    ///
    /// Returns the ABI's fingerprint, comparable with bytecode fingerprints.
    pub fn add_abi_json(
        &mut self,
        name: &str,
        abi_json: &str,
        address: Option<&str>,
    ) -> Result<Option<String>, DecoderError> {
        let abi: JsonAbi = serde_json::from_str(abi_json)
            .map_err(|e| DecoderError::InvalidAbi(format!("{name}: {e}")))?;
        Ok(self.add_abi(name, abi, address))
    }

    pub fn add_abi(&mut self, name: &str, abi: JsonAbi, address: Option<&str>) -> Option<String> {
        let index = self.entries.len();
        let mut functions = HashMap::new();
        let mut signatures = HashMap::new();
        let mut function_sigs = Vec::new();
        let mut event_sigs = Vec::new();

        for function in abi.functions() {
            let selector = hex::encode(function.selector());
            let signature = function.signature();
            signatures.insert(selector.clone(), signature.clone());
            functions.insert(selector, function.clone());
            function_sigs.push(signature);
        }
        for event in abi.events() {
            let signature = event.signature();
            signatures.insert(hex::encode(event.selector()), signature.clone());
            event_sigs.push(signature);
        }

        let fingerprint = compute_fingerprint(&function_sigs, &event_sigs);
        for hash in signatures.keys() {
            self.by_hash.entry(hash.clone()).or_default().push(index);
        }
        if let Some(fp) = &fingerprint {
            self.by_fingerprint.entry(fp.clone()).or_insert(index);
        }
        if let Some(address) = address {
            self.by_address.insert(address.to_ascii_lowercase(), index);
        }
        tracing::debug!(
            name,
            functions = functions.len(),
            events = event_sigs.len(),
            fingerprint = ?fingerprint,
            "registered ABI"
        );

        self.entries.push(AbiEntry {
            name: name.to_string(),
            fingerprint: fingerprint.clone(),
            functions,
            signatures,
        });
        fingerprint
    }

    /// Fingerprint of the ABI registered at `address`.
    pub fn fingerprint_for(&self, address: &str) -> Option<&str> {
        self.entry_at(address)?.fingerprint.as_deref()
    }

    fn entry_at(&self, address: &str) -> Option<&AbiEntry> {
        let index = self.by_address.get(&address.to_ascii_lowercase())?;
        self.entries.get(*index)
    }

    fn entry_with_fingerprint(&self, fingerprint: &str) -> Option<&AbiEntry> {
        let index = self.by_fingerprint.get(fingerprint)?;
        self.entries.get(*index)
    }

    /// Entries to consult for `hash`: the one bound to `address`, then the one
    /// whose fingerprint matches, then every entry defining it.
    fn candidates<'a>(
        &'a self,
        hash: &str,
        address: Option<&str>,
        fingerprint: Option<&str>,
    ) -> impl Iterator<Item = &'a AbiEntry> + 'a {
        let scoped = address.and_then(|a| self.entry_at(a));
        let matched = fingerprint.and_then(|fp| self.entry_with_fingerprint(fp));
        let global = self
            .by_hash
            .get(hash)
            .into_iter()
            .flatten()
            .filter_map(|i| self.entries.get(*i));
        scoped.into_iter().chain(matched).chain(global)
    }

    fn function_for(
        &self,
        selector: &str,
        address: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Option<&Function> {
        self.candidates(selector, address, fingerprint)
            .find_map(|entry| entry.functions.get(selector))
    }

    /// Decode transaction input against the registered ABIs.
    ///
    /// The ABI bound to `address` is preferred, then the ABI whose
    /// fingerprint equals `fingerprint`, then any ABI defining the selector.
    pub fn decode_function_call(
        &self,
        input: &str,
        address: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<FunctionCall, DecoderError> {
        let data = hex::decode(input.strip_prefix("0x").unwrap_or(input))?;
        if data.len() < 4 {
            return Err(DecoderError::ShortInput { len: data.len() });
        }
        let selector = hex::encode(&data[..4]);
        let function = self
            .function_for(&selector, address, fingerprint)
            .ok_or_else(|| DecoderError::UnknownSelector {
                selector: selector.clone(),
            })?;
        decode_inputs(function, &data[4..])
    }
}

impl SignatureMatcher for AbiRepository {
    fn matching_signature(&self, hash: &str, address: Option<&str>) -> Option<String> {
        self.candidates(hash, address, None)
            .find_map(|entry| entry.signatures.get(hash).cloned())
    }
}

impl ContractNameLookup for AbiRepository {
    fn contract_name(&self, address: &str, fingerprint: Option<&str>) -> Option<String> {
        if let Some(entry) = self.entry_at(address) {
            return Some(entry.name.clone());
        }
        self.entry_with_fingerprint(fingerprint?)
            .map(|e| e.name.clone())
    }
}

fn decode_inputs(function: &Function, data: &[u8]) -> Result<FunctionCall, DecoderError> {
    let signature = function.signature();
    let decode_error = |reason: String| DecoderError::Decode {
        signature: signature.clone(),
        reason,
    };

    let types = function
        .inputs
        .iter()
        .map(|p| p.resolve().map_err(|e| decode_error(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let values = if types.is_empty() {
        vec![]
    } else {
        match DynSolType::Tuple(types)
            .abi_decode_params(data)
            .map_err(|e| decode_error(e.to_string()))?
        {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        }
    };

    let params: Vec<FunctionParam> = function
        .inputs
        .iter()
        .zip(values)
        .map(|(param, value)| FunctionParam {
            name: (!param.name.is_empty()).then(|| param.name.clone()),
            ty: param.selector_type().into_owned(),
            value: to_json(value, &param.components),
        })
        .collect();

    let args = params
        .iter()
        .map(|p| Some((p.name.clone()?, p.value.clone())))
        .collect::<Option<Map<String, Value>>>()
        .filter(|args| !args.is_empty());

    Ok(FunctionCall {
        name: function.name.clone(),
        signature,
        params,
        args,
        extra: Map::new(),
    })
}

/// JSON rendering of a decoded value: checksummed addresses, decimal
/// integer strings, `0x` hex bytes. Tuples with fully named components
/// become objects.
fn to_json(value: DynSolValue, components: &[Param]) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(format!("0x{}", hex::encode(&word[..size]))),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::String(s) => Value::String(s),
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            Value::Array(items.into_iter().map(|v| to_json(v, components)).collect())
        }
        DynSolValue::Tuple(fields) => {
            let named = fields.len() == components.len() && components.iter().all(|c| !c.name.is_empty());
            if named {
                Value::Object(
                    components
                        .iter()
                        .zip(fields)
                        .map(|(c, v)| (c.name.clone(), to_json(v, &c.components)))
                        .collect(),
                )
            } else {
                Value::Array(
                    fields
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| {
                            let nested = components.get(i).map(|c| c.components.as_slice()).unwrap_or(&[]);
                            to_json(v, nested)
                        })
                        .collect(),
                )
            }
        }
        other => Value::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DISPERSE_ABI: &str = r#"[
        {"type":"function","name":"disperseEther","stateMutability":"payable","outputs":[],
         "inputs":[{"name":"recipients","type":"address[]"},{"name":"values","type":"uint256[]"}]},
        {"type":"function","name":"disperseToken","stateMutability":"nonpayable","outputs":[],
         "inputs":[{"name":"token","type":"address"},{"name":"recipients","type":"address[]"},{"name":"values","type":"uint256[]"}]}
    ]"#;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"approve","stateMutability":"nonpayable",
         "inputs":[{"name":"","type":"address"},{"name":"","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"event","name":"Transfer","anonymous":false,
         "inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]}
    ]"#;

    const DISPERSE_INPUT: &str = concat!(
        "0xe63d38ed",
        "0000000000000000000000000000000000000000000000000000000000000040",
        "00000000000000000000000000000000000000000000000000000000000000a0",
        "0000000000000000000000000000000000000000000000000000000000000002",
        "00000000000000000000000083d50977190c592bb9f03054500b1fd81b53dd49",
        "000000000000000000000000dc7cd9b725726f5dcd646d3a2c768e4636a89578",
        "0000000000000000000000000000000000000000000000000000000000000002",
        "00000000000000000000000000000000000000000000000002c68af0bb140000",
        "00000000000000000000000000000000000000000000000002c68af0bb140000",
    );

    fn repo() -> AbiRepository {
        let mut repo = AbiRepository::new();
        repo.add_abi_json("Disperse", DISPERSE_ABI, None).unwrap();
        repo.add_abi_json("ERC20", ERC20_ABI, Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"))
            .unwrap();
        repo
    }

    #[test]
    fn decodes_disperse_ether() {
        let call = repo().decode_function_call(DISPERSE_INPUT, None, None).unwrap();
        let recipients = json!([
            "0x83D50977190c592BB9F03054500B1fd81B53Dd49",
            "0xDC7cD9b725726F5Dcd646D3A2C768E4636a89578"
        ]);
        let values = json!(["200000000000000000", "200000000000000000"]);

        assert_eq!(call.name, "disperseEther");
        assert_eq!(call.signature, "disperseEther(address[],uint256[])");
        assert_eq!(call.params.len(), 2);
        assert_eq!(call.params[0].name.as_deref(), Some("recipients"));
        assert_eq!(call.params[0].ty, "address[]");
        assert_eq!(call.params[0].value, recipients);
        assert_eq!(call.params[1].value, values);
        let args = call.args.unwrap();
        assert_eq!(args["recipients"], recipients);
        assert_eq!(args["values"], values);
    }

    #[test]
    fn anonymous_params_have_no_args() {
        let input = format!(
            "0x095ea7b3{:0>64}{:064x}",
            "83d50977190c592bb9f03054500b1fd81b53dd49", 1000
        );
        let call = repo().decode_function_call(&input, None, None).unwrap();
        assert_eq!(call.name, "approve");
        assert_eq!(call.params[1].value, json!("1000"));
        assert!(call.args.is_none());
        assert!(call.params[0].name.is_none());
    }

    #[test]
    fn unknown_selector_and_short_input() {
        assert!(matches!(
            repo().decode_function_call("0xdeadbeef", None, None),
            Err(DecoderError::UnknownSelector { .. })
        ));
        assert!(matches!(
            repo().decode_function_call("0x0102", None, None),
            Err(DecoderError::ShortInput { len: 2 })
        ));
    }

    #[test]
    fn truncated_arguments_fail() {
        let input = &DISPERSE_INPUT[..DISPERSE_INPUT.len() - 64];
        assert!(matches!(
            repo().decode_function_call(input, None, None),
            Err(DecoderError::Decode { .. })
        ));
    }

    #[test]
    fn matches_selectors_and_topics() {
        let repo = repo();
        assert_eq!(
            repo.matching_signature("a9059cbb", None).as_deref(),
            Some("transfer(address,uint256)")
        );
        assert_eq!(
            repo.matching_signature(
                "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
                None
            )
            .as_deref(),
            Some("Transfer(address,address,uint256)")
        );
        assert_eq!(repo.matching_signature("ffffffff", None), None);
    }

    #[test]
    fn names_by_address_then_fingerprint() {
        let repo = repo();
        assert_eq!(
            repo.contract_name("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", None)
                .as_deref(),
            Some("ERC20")
        );
        let fp = repo
            .fingerprint_for("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
            .map(str::to_string);
        assert_eq!(
            repo.contract_name("0x0000000000000000000000000000000000000001", fp.as_deref())
                .as_deref(),
            Some("ERC20")
        );
        assert_eq!(repo.contract_name("0x01", None), None);
    }

    #[test]
    fn fingerprint_picks_the_matching_abi() {
        const WETH_ABI: &str = r#"[
            {"type":"function","name":"transfer","stateMutability":"nonpayable",
             "inputs":[{"name":"dst","type":"address"},{"name":"wad","type":"uint256"}],
             "outputs":[{"name":"","type":"bool"}]}
        ]"#;
        let mut repo = AbiRepository::new();
        repo.add_abi_json("WETH", WETH_ABI, None).unwrap();
        let fingerprint = repo.add_abi_json("ERC20", ERC20_ABI, None).unwrap();
        let input = format!(
            "0xa9059cbb{:0>64}{:064x}",
            "83d50977190c592bb9f03054500b1fd81b53dd49", 5
        );

        let by_selector = repo.decode_function_call(&input, None, None).unwrap();
        assert_eq!(by_selector.params[0].name.as_deref(), Some("dst"));

        let by_fingerprint = repo
            .decode_function_call(&input, None, fingerprint.as_deref())
            .unwrap();
        assert_eq!(by_fingerprint.params[0].name.as_deref(), Some("to"));
        assert!(by_fingerprint.extra.is_empty());
    }

    #[test]
    fn invalid_abi_is_rejected() {
        let mut repo = AbiRepository::new();
        assert!(matches!(
            repo.add_abi_json("broken", "{", None),
            Err(DecoderError::InvalidAbi(_))
        ));
        assert!(repo.is_empty());
    }
}
