//! Bytecode scanning and contract fingerprints.
//!
//! A contract's fingerprint is the keccak256 of its sorted, de-duplicated
//! function signatures and event signatures:
//!
//! ```text
//! keccak256("approve(address,uint256),transfer(address,uint256)|Transfer(address,address,uint256)")
//! ```
//!
//! Signatures are recovered by scanning PUSH4/PUSH32 immediates and asking a
//! [`SignatureMatcher`] whether the pushed bytes are a known selector or topic.

use std::collections::BTreeSet;

use tiny_keccak::{Hasher, Keccak};

const PUSH1: u8 = 0x60;
const PUSH32: u8 = 0x7f;

/// Resolves a selector (4 bytes) or event topic (32 bytes) to its signature.
///
/// `hash` is lowercase hex without `0x`. `address` narrows the lookup to the
/// ABI registered for that contract when the implementation supports it.
pub trait SignatureMatcher: Send + Sync {
    fn matching_signature(&self, hash: &str, address: Option<&str>) -> Option<String>;
}

impl<F> SignatureMatcher for F
where
    F: Fn(&str, Option<&str>) -> Option<String> + Send + Sync,
{
    fn matching_signature(&self, hash: &str, address: Option<&str>) -> Option<String> {
        self(hash, address)
    }
}

/// Resolves a human readable contract name.
pub trait ContractNameLookup: Send + Sync {
    fn contract_name(&self, address: &str, fingerprint: Option<&str>) -> Option<String>;
}

impl<F> ContractNameLookup for F
where
    F: Fn(&str, Option<&str>) -> Option<String> + Send + Sync,
{
    fn contract_name(&self, address: &str, fingerprint: Option<&str>) -> Option<String> {
        self(address, fingerprint)
    }
}

/// Sorted, de-duplicated signatures recovered from bytecode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionsAndEvents {
    pub functions: Vec<String>,
    pub events: Vec<String>,
}

impl FunctionsAndEvents {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.events.is_empty()
    }

    pub fn fingerprint(&self) -> Option<String> {
        compute_fingerprint(&self.functions, &self.events)
    }
}

/// Immediates of every PUSH4 and PUSH32 in `code`, in order.
///
/// Push data is skipped rather than decoded as opcodes. A push truncated by
/// the end of the code yields nothing.
pub fn push_candidates(code: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        if (PUSH1..=PUSH32).contains(&op) {
            let len = usize::from(op - PUSH1 + 1);
            let start = i + 1;
            let end = start + len;
            if (len == 4 || len == 32) && end <= code.len() {
                out.push(&code[start..end]);
            }
            i += len;
        }
        i += 1;
    }
    out
}

/// Recover function and event signatures from hex bytecode.
///
/// Undecodable hex is treated as code without signatures.
pub fn extract_functions_and_events(
    code: &str,
    address: Option<&str>,
    matcher: &dyn SignatureMatcher,
) -> FunctionsAndEvents {
    let raw = match hex::decode(code.strip_prefix("0x").unwrap_or(code)) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(?address, error = %e, "bytecode is not valid hex");
            return FunctionsAndEvents::default();
        }
    };

    let mut functions = BTreeSet::new();
    let mut events = BTreeSet::new();
    for data in push_candidates(&raw) {
        let hash = hex::encode(data);
        if let Some(sig) = matcher.matching_signature(&hash, address) {
            if data.len() == 4 {
                functions.insert(sig);
            } else {
                events.insert(sig);
            }
        }
    }

    FunctionsAndEvents {
        functions: functions.into_iter().collect(),
        events: events.into_iter().collect(),
    }
}

/// Fingerprint over a signature set; `None` when both lists are empty.
///
/// Inputs are sorted and de-duplicated first, so declaration order does not
/// matter.
pub fn compute_fingerprint(functions: &[String], events: &[String]) -> Option<String> {
    if functions.is_empty() && events.is_empty() {
        return None;
    }
    let functions: BTreeSet<&str> = functions.iter().map(String::as_str).collect();
    let events: BTreeSet<&str> = events.iter().map(String::as_str).collect();
    let joined = format!(
        "{}|{}",
        functions.into_iter().collect::<Vec<_>>().join(","),
        events.into_iter().collect::<Vec<_>>().join(",")
    );
    let fingerprint = hex::encode(keccak256(joined.as_bytes()));
    tracing::trace!(%fingerprint, "computed fingerprint");
    Some(fingerprint)
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// First four bytes of `keccak256(signature)` as hex.
pub fn selector(signature: &str) -> String {
    hex::encode(&keccak256(signature.as_bytes())[..4])
}

/// Full `keccak256(signature)` as hex, the topic of an event.
pub fn topic(signature: &str) -> String {
    hex::encode(keccak256(signature.as_bytes()))
}
