//! Named bytecode predicates.
//!
//! Every check is a substring search over lowercase hex bytecode. A selector
//! that happens to appear inside push data will match too; that is accepted.

use crate::proxy::{META_PROXY_CLONE, MINIMAL_PROXY_CLONE, SIMPLE_MULTISIG_CLONE};
use crate::signatures::*;

fn contains_all(code: &str, needles: &[&str]) -> bool {
    needles.iter().all(|n| code.contains(n))
}

/// Externally owned accounts return empty code.
pub fn is_wallet(code: &str) -> bool {
    code == "0x" || code.is_empty()
}

// ─── Proxies ──────────────────────────────────────────────────────────────────

pub fn uses_eip1967_storage_slot(code: &str) -> bool {
    code.contains(EIP1967_IMPL_SLOT)
}

pub fn uses_open_zeppelin_storage_slot(code: &str) -> bool {
    code.contains(OPEN_ZEPPELIN_IMPL_SLOT)
}

pub fn uses_polygon_storage_slot(code: &str) -> bool {
    code.contains(POLYGON_IMPL_SLOT)
}

pub fn uses_eip1822_storage_slot(code: &str) -> bool {
    code.contains(EIP1822_PROXIABLE_SLOT)
}

/// EIP-897 delegate proxy: `implementation()` + `proxyType()`, or one of the
/// well-known implementation slots.
pub fn is_erc897_proxy(code: &str) -> bool {
    contains_all(code, &[IMPLEMENTATION, PROXY_TYPE])
        || uses_open_zeppelin_storage_slot(code)
        || uses_polygon_storage_slot(code)
}

pub fn is_erc1967_proxy(code: &str) -> bool {
    contains_all(code, &[IMPLEMENTATION, FALLBACK, UPGRADED_EVENT]) || uses_eip1967_storage_slot(code)
}

/// UUPS proxy exposing `proxiableUUID()`.
pub fn is_erc1822_proxy(code: &str) -> bool {
    code.contains(PROXIABLE_UUID)
}

pub fn is_gnosis_safe(code: &str) -> bool {
    contains_all(code, &[GNOSIS_SAFE_ADDRESS_MASK, GNOSIS_SAFE_MASTER_COPY_CALLDATA])
}

/// Pre-Safe Gnosis MultiSigWallet.
pub fn is_old_gnosis_multisig(code: &str) -> bool {
    contains_all(code, &[GNOSIS_IS_OWNER, GNOSIS_REQUIRED])
        && (code.contains(GNOSIS_IS_CONFIRMED_BYTES32) || code.contains(GNOSIS_IS_CONFIRMED_UINT256))
}

pub fn is_minimal_proxy_clone(code: &str) -> bool {
    MINIMAL_PROXY_CLONE.is_match(code)
}

pub fn is_meta_proxy_clone(code: &str) -> bool {
    META_PROXY_CLONE.is_match(code)
}

pub fn is_simple_multisig_clone(code: &str) -> bool {
    SIMPLE_MULTISIG_CLONE.is_match(code)
}

pub fn is_clone(code: &str) -> bool {
    is_minimal_proxy_clone(code) || is_meta_proxy_clone(code) || is_simple_multisig_clone(code)
}

/// EIP-2535 multi-facet proxy.
pub fn is_diamond_proxy(code: &str) -> bool {
    contains_all(
        code,
        &[DIAMOND_CUT, DIAMOND_FACETS, DIAMOND_FACET_ADDRESS, SUPPORTS_INTERFACE],
    )
}

// ─── Tokens ───────────────────────────────────────────────────────────────────

pub fn is_erc20(code: &str) -> bool {
    contains_all(code, &[NAME, SYMBOL, DECIMALS, BALANCE_OF, TRANSFER_EVENT]) && !code.contains(IS_SET)
}

/// Advertises the ERC721 interface id.
pub fn is_erc721(code: &str) -> bool {
    code.contains(ERC721_INTERFACE_ID)
}

/// Carries the full ERC721 selector set without advertising the interface id.
pub fn implements_erc721(code: &str) -> bool {
    contains_all(
        code,
        &[
            TRANSFER_EVENT_PREFIX,
            APPROVAL_EVENT_PREFIX,
            APPROVAL_FOR_ALL_EVENT_PREFIX,
            OWNER_OF,
            SAFE_TRANSFER_FROM_BYTES,
            SAFE_TRANSFER_FROM,
            TRANSFER_FROM,
            APPROVE,
            SET_APPROVAL_FOR_ALL,
            GET_APPROVED,
            IS_APPROVED_FOR_ALL,
            BALANCE_OF,
            SUPPORTS_INTERFACE,
        ],
    )
}

pub fn is_erc1155(code: &str) -> bool {
    code.contains(ERC1155_INTERFACE_ID)
}

/// ERC20 unless the code also advertises ERC721 or ERC1155.
pub fn is_erc20_contract_code(code: &str) -> bool {
    !is_erc721(code) && !is_erc1155(code) && is_erc20(code)
}

pub fn is_erc721_contract_code(code: &str) -> bool {
    !is_erc1155(code) && (is_erc721(code) || implements_erc721(code))
}

pub fn is_erc1155_contract_code(code: &str) -> bool {
    !is_erc721(code) && !is_erc20(code) && is_erc1155(code)
}

pub fn is_erc721_receiver(code: &str) -> bool {
    code.contains(ERC721_RECEIVER_INTERFACE_ID)
}

pub fn has_erc721_metadata_extension(code: &str) -> bool {
    code.contains(ERC721_METADATA_INTERFACE_ID)
}

pub fn has_erc721_enumeration_extension(code: &str) -> bool {
    code.contains(ERC721_ENUMERATION_INTERFACE_ID)
}

pub fn has_erc721_base_uri_support(code: &str) -> bool {
    code.contains(BASE_URI)
}

pub fn has_erc721_token_uri_support(code: &str) -> bool {
    code.contains(TOKEN_URI)
}

pub fn is_erc1155_receiver(code: &str) -> bool {
    code.contains(ERC1155_RECEIVER_INTERFACE_ID)
}

pub fn has_erc1155_metadata_extension(code: &str) -> bool {
    code.contains(ERC1155_METADATA_INTERFACE_ID)
}

// ─── Everything else ──────────────────────────────────────────────────────────

/// ERC3156 lender.
pub fn is_flash_loan_lender(code: &str) -> bool {
    contains_all(code, &[FLASH_LOAN, MAX_FLASH_LOAN])
}

pub fn is_flash_loan_receiver(code: &str) -> bool {
    code.contains(ON_FLASH_LOAN)
}

pub fn is_erc1820_registry(code: &str) -> bool {
    contains_all(
        code,
        &[
            ERC1820_ACCEPT_MAGIC,
            ERC1820_CAN_IMPLEMENT_INTERFACE,
            ERC1820_GET_INTERFACE_IMPLEMENTER,
            ERC1820_SET_INTERFACE_IMPLEMENTER,
            ERC1820_UPDATE_ERC165_CACHE,
        ],
    )
}

/// ERC3668 (CCIP read) offchain resolver.
pub fn is_erc3668(code: &str) -> bool {
    contains_all(
        code,
        &[
            ERC3668_MAKE_SIGNATURE_HASH,
            ERC3668_RESOLVE_WITH_PROOF,
            ERC3668_NEW_SIGNERS_EVENT,
            ERC3668_URL,
        ],
    )
}
