//! Well-known selectors, event topics, interface ids and storage slots.
//!
//! All values are lowercase hex without `0x` so they can be searched for
//! directly inside `eth_getCode` output.

// ─── ERC165 interface ids ─────────────────────────────────────────────────────

/// `supportsInterface(bytes4)`
pub const SUPPORTS_INTERFACE: &str = "01ffc9a7";
pub const ERC721_INTERFACE_ID: &str = "80ac58cd";
pub const ERC721_RECEIVER_INTERFACE_ID: &str = "150b7a02";
pub const ERC721_METADATA_INTERFACE_ID: &str = "5b5e139f";
pub const ERC721_ENUMERATION_INTERFACE_ID: &str = "780e9d63";
pub const ERC1155_INTERFACE_ID: &str = "d9b67a26";
pub const ERC1155_RECEIVER_INTERFACE_ID: &str = "4e2312e0";
pub const ERC1155_METADATA_INTERFACE_ID: &str = "0e89341c";

// ─── Proxy storage slots ──────────────────────────────────────────────────────

/// `keccak256("eip1967.proxy.implementation") - 1`
pub const EIP1967_IMPL_SLOT: &str =
    "360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// `keccak256("org.zeppelinos.proxy.implementation")`, EIP-897 delegate proxies
pub const OPEN_ZEPPELIN_IMPL_SLOT: &str =
    "7050c9e0f4ca769c69bd3a8ef740bc37934f8e2c036e5a723fd8ee048ed3f8c3";

/// `keccak256("matic.network.proxy.implementation")`
pub const POLYGON_IMPL_SLOT: &str =
    "baab7dbf64751104133af04abc7d9979f0fda3b059a322a8333f533d3f32bf7f";

/// `keccak256("PROXIABLE")`
pub const EIP1822_PROXIABLE_SLOT: &str =
    "c5f16f0fcc639fa48a6947836d9850f504798523bf8c9a3a87d5876cf622bcf7";

/// Gnosis Safe proxies keep the master copy in slot 0 and mask it with this.
pub const GNOSIS_SAFE_ADDRESS_MASK: &str = "ffffffffffffffffffffffffffffffffffffffff";
pub const GNOSIS_SAFE_STORAGE_SLOT: &str = "0x0";
/// `masterCopy()` selector right padded to 32 bytes, as loaded by the proxy.
pub const GNOSIS_SAFE_MASTER_COPY_CALLDATA: &str =
    "a619486e00000000000000000000000000000000000000000000000000000000";

// ─── Event topics ─────────────────────────────────────────────────────────────

/// `Upgraded(address)`
pub const UPGRADED_EVENT: &str =
    "bc7cd75a20ee27fd9adebab32041f755214dbc6bffa90cc0225b39da2e5c2d3b";
/// `Transfer(address,address,uint256)`
pub const TRANSFER_EVENT: &str =
    "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
/// ERC3668 `NewSigners(address[])`
pub const ERC3668_NEW_SIGNERS_EVENT: &str =
    "ab0b9cc3a46b568cb08d985497cde8ab7e18892d01f58db7dc7f0d2af859b2d7";

// ─── Function selectors ───────────────────────────────────────────────────────

pub const IMPLEMENTATION: &str = "5c60da1b";
pub const PROXY_TYPE: &str = "4555d5c9";
pub const FALLBACK: &str = "552079dc";
pub const PROXIABLE_UUID: &str = "52d1902d";

pub const NAME: &str = "06fdde03";
pub const SYMBOL: &str = "95d89b41";
pub const DECIMALS: &str = "313ce567";
pub const TOTAL_SUPPLY: &str = "18160ddd";
pub const BALANCE_OF: &str = "70a08231";
/// `isSet(address)`, present on registries that otherwise look like tokens.
pub const IS_SET: &str = "74ebe3ec";

pub const BASE_URI: &str = "6c0360eb";
pub const TOKEN_BY_INDEX: &str = "4f6ccce7";
pub const TOKEN_URI: &str = "c87b56dd";
/// First four bytes of the `Transfer` topic; also matches inlined event ids.
pub const TRANSFER_EVENT_PREFIX: &str = "ddf252ad";
/// First four bytes of the `Approval(address,address,uint256)` topic.
pub const APPROVAL_EVENT_PREFIX: &str = "8c5be1e5";
/// First four bytes of the `ApprovalForAll(address,address,bool)` topic.
pub const APPROVAL_FOR_ALL_EVENT_PREFIX: &str = "17307eab";
pub const OWNER_OF: &str = "6352211e";
pub const SAFE_TRANSFER_FROM_BYTES: &str = "b88d4fde";
pub const SAFE_TRANSFER_FROM: &str = "42842e0e";
pub const TRANSFER_FROM: &str = "23b872dd";
pub const APPROVE: &str = "095ea7b3";
pub const SET_APPROVAL_FOR_ALL: &str = "a22cb465";
pub const GET_APPROVED: &str = "081812fc";
pub const IS_APPROVED_FOR_ALL: &str = "e985e9c5";

pub const GNOSIS_GET_OWNERS: &str = "a0e67e2b";
pub const GNOSIS_IS_OWNER: &str = "2f54bf6e";
pub const GNOSIS_REQUIRED: &str = "dc8452cd";
pub const GNOSIS_IS_CONFIRMED_BYTES32: &str = "6486aa51";
pub const GNOSIS_IS_CONFIRMED_UINT256: &str = "784547a7";

pub const DIAMOND_CUT: &str = "1f931c1c";
pub const DIAMOND_FACET_ADDRESS: &str = "cdffacc6";
pub const DIAMOND_FACETS: &str = "7a0ed627";

pub const FLASH_LOAN: &str = "5cffe9de";
pub const MAX_FLASH_LOAN: &str = "613255ab";
pub const ON_FLASH_LOAN: &str = "23e30c8b";

/// ASCII `ERC1820_ACCEPT_MAGIC`
pub const ERC1820_ACCEPT_MAGIC: &str = "455243313832305f4143434550545f4d41474943";
pub const ERC1820_CAN_IMPLEMENT_INTERFACE: &str = "f0083250";
pub const ERC1820_GET_INTERFACE_IMPLEMENTER: &str = "aabbb8ca";
pub const ERC1820_SET_INTERFACE_IMPLEMENTER: &str = "29965a1d";
pub const ERC1820_UPDATE_ERC165_CACHE: &str = "a41e7d51";

pub const ERC3668_RESOLVE_WITH_PROOF: &str = "f4d4d2f8";
pub const ERC3668_MAKE_SIGNATURE_HASH: &str = "1dcfea09";
pub const ERC3668_URL: &str = "5600f04f";
