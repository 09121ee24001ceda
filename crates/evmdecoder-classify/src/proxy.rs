//! Proxy and clone patterns.
//!
//! ## Supported patterns
//!
//! | Pattern | Detection | Standard |
//! |---------|-----------|----------|
//! | EIP-897 delegate proxy | `implementation()`+`proxyType()`, OZ/Polygon slot | ERC897 |
//! | EIP-1822 UUPS proxy | `proxiableUUID()` / PROXIABLE slot | ERC1822 |
//! | EIP-1967 logic proxy | Storage slot / `Upgraded` event | ERC1967 |
//! | EIP-1167 minimal proxy | Bytecode pattern | ERC1167 |
//! | EIP-3448 metaproxy | Bytecode pattern | ERC3448 |
//! | Simple multisig clone | Bytecode pattern | none |
//! | Gnosis Safe | Slot 0 masked by `masterCopy()` | none |
//!
//! Bytecode-pattern clones carry their target inline and need no RPC call.
//! Storage and call based resolution is done by [`crate::Classifier`].

use once_cell::sync::Lazy;
use regex::Regex;

/// EIP-1167 minimal proxy; captures the 20-byte implementation address.
pub static MINIMAL_PROXY_CLONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"363d3d373d3d3d363d73(?P<target>[a-f0-9]{40})5af43d82803e903d91602b57fd5bf3")
        .expect("valid minimal proxy pattern")
});

/// EIP-3448 metaproxy.
pub static META_PROXY_CLONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"363d3d373d3d3d3d60368038038091363936013d73(?P<target>[a-f0-9]{40})5af43d3d93803e603457fd5bf3",
    )
    .expect("valid metaproxy pattern")
});

/// Clones produced by the simple multisig factory; anchored at the start of
/// the code.
pub static SIMPLE_MULTISIG_CLONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^0x36600080376020600036600073(?P<target>[a-f0-9]{40})6102c65a03f41515602d57fe5b60206000f3",
    )
    .expect("valid simple multisig clone pattern")
});

/// The address a clone delegates to, from the first pattern that matches.
pub fn cloned_target(code: &str) -> Option<String> {
    [&MINIMAL_PROXY_CLONE, &META_PROXY_CLONE, &SIMPLE_MULTISIG_CLONE]
        .into_iter()
        .find_map(|re| re.captures(code))
        .and_then(|caps| caps.name("target"))
        .map(|m| format!("0x{}", m.as_str()))
}

/// Address held in the low 20 bytes of a storage word.
///
/// Returns `None` for an all-zero word or a value too short to hold an
/// address.
pub fn storage_to_address(slot_value: &str) -> Option<String> {
    let hex = slot_value.strip_prefix("0x").unwrap_or(slot_value);
    if hex.len() < 40 || hex.chars().all(|c| c == '0') {
        return None;
    }
    let addr_hex = &hex[hex.len() - 40..];
    if addr_hex.chars().all(|c| c == '0') {
        return None;
    }
    Some(format!("0x{}", addr_hex.to_ascii_lowercase()))
}
