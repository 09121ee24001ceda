//! `eth_call` result decoding and argument encoding.

use std::str::FromStr;

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, U256};

use crate::error::ClassifyError;

/// Declared shape of an `eth_call` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// Raw return data, `0x`-prefixed.
    Hex,
    String,
    Uint256,
    Address,
    AddressArray,
}

/// A decoded `eth_call` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Hex(String),
    String(String),
    Uint(U256),
    Address(String),
    Addresses(Vec<String>),
}

/// Decode `data` (hex, with or without `0x`) as `output`.
pub fn decode_response(data: &str, output: OutputType) -> Result<Decoded, ClassifyError> {
    Ok(match output {
        OutputType::Hex => Decoded::Hex(with_prefix(data)),
        OutputType::String => Decoded::String(decode_string(data)?),
        OutputType::Uint256 => Decoded::Uint(decode_uint256(data)?),
        OutputType::Address => Decoded::Address(decode_address(data)?),
        OutputType::AddressArray => Decoded::Addresses(decode_address_array(data)?),
    })
}

/// ABI `string`, falling back to the raw bytes as ASCII with NULs removed
/// for contracts that return `bytes32` names.
pub fn decode_string(data: &str) -> Result<String, ClassifyError> {
    let bytes = hex_bytes(data)?;
    match DynSolType::String.abi_decode(&bytes) {
        Ok(DynSolValue::String(s)) => Ok(s),
        _ => Ok(bytes
            .iter()
            .filter(|b| **b != 0)
            .map(|&b| char::from(b))
            .collect()),
    }
}

pub fn decode_uint256(data: &str) -> Result<U256, ClassifyError> {
    match abi_decode(&DynSolType::Uint(256), data)? {
        DynSolValue::Uint(value, _) => Ok(value),
        other => Err(unexpected("uint256", &other)),
    }
}

/// ABI `address`, EIP-55 checksummed.
pub fn decode_address(data: &str) -> Result<String, ClassifyError> {
    match abi_decode(&DynSolType::Address, data)? {
        DynSolValue::Address(addr) => Ok(addr.to_checksum(None)),
        other => Err(unexpected("address", &other)),
    }
}

pub fn decode_address_array(data: &str) -> Result<Vec<String>, ClassifyError> {
    let ty = DynSolType::Array(Box::new(DynSolType::Address));
    match abi_decode(&ty, data)? {
        DynSolValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                DynSolValue::Address(addr) => Ok(addr.to_checksum(None)),
                other => Err(unexpected("address", &other)),
            })
            .collect(),
        other => Err(unexpected("address[]", &other)),
    }
}

/// 32-byte big-endian word, `0x`-prefixed.
pub fn encode_uint256(value: U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

/// EIP-55 form of `address`.
pub fn to_checksum_address(address: &str) -> Result<String, ClassifyError> {
    Address::from_str(address)
        .map(|a| a.to_checksum(None))
        .map_err(|_| ClassifyError::InvalidAddress(address.to_string()))
}

fn abi_decode(ty: &DynSolType, data: &str) -> Result<DynSolValue, ClassifyError> {
    let bytes = hex_bytes(data)?;
    ty.abi_decode(&bytes)
        .map_err(|e| ClassifyError::Decode(format!("{}: {e}", ty.sol_type_name())))
}

fn hex_bytes(data: &str) -> Result<Vec<u8>, ClassifyError> {
    Ok(hex::decode(data.strip_prefix("0x").unwrap_or(data))?)
}

fn with_prefix(data: &str) -> String {
    if data.starts_with("0x") {
        data.to_string()
    } else {
        format!("0x{data}")
    }
}

fn unexpected(expected: &str, got: &DynSolValue) -> ClassifyError {
    ClassifyError::Decode(format!("expected {expected}, got {got:?}"))
}
