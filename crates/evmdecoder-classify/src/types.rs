//! Classification output types.
//!
//! Serialized camelCase with absent fields omitted, matching the shape
//! downstream consumers index.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A token or interface standard recognised in bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Standard {
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC897")]
    Erc897,
    #[serde(rename = "ERC1155")]
    Erc1155,
    #[serde(rename = "ERC1167")]
    Erc1167,
    #[serde(rename = "ERC1820")]
    Erc1820,
    #[serde(rename = "ERC1822")]
    Erc1822,
    #[serde(rename = "ERC1967")]
    Erc1967,
    #[serde(rename = "ERC2535")]
    Erc2535,
    #[serde(rename = "ERC3156")]
    Erc3156,
    #[serde(rename = "ERC3448")]
    Erc3448,
    #[serde(rename = "ERC3668")]
    Erc3668,
}

impl Standard {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Erc20 => "ERC20",
            Self::Erc721 => "ERC721",
            Self::Erc897 => "ERC897",
            Self::Erc1155 => "ERC1155",
            Self::Erc1167 => "ERC1167",
            Self::Erc1820 => "ERC1820",
            Self::Erc1822 => "ERC1822",
            Self::Erc1967 => "ERC1967",
            Self::Erc2535 => "ERC2535",
            Self::Erc3156 => "ERC3156",
            Self::Erc3448 => "ERC3448",
            Self::Erc3668 => "ERC3668",
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a contract is, as opposed to which standards it follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    Token,
    #[serde(rename = "NFT")]
    Nft,
    MultiToken,
    FlashLoan,
    ContractRegistry,
    OffchainResolver,
    DiamondProxy,
    GnosisSafe,
    GnosisMultisig,
}

impl ContractKind {
    pub fn is_gnosis(self) -> bool {
        matches!(self, Self::GnosisSafe | Self::GnosisMultisig)
    }
}

/// One hop in a proxy chain. `target`, when known, is the address that was
/// classified next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractProxy {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<Standard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ContractProxy {
    pub(crate) fn new(address: &str, standard: Option<Standard>, target: Option<String>) -> Self {
        Self {
            address: address.to_string(),
            standard,
            sub_type: None,
            target,
        }
    }

    pub(crate) fn sub_type(mut self, sub_type: &str) -> Self {
        self.sub_type = Some(sub_type.to_string());
        self
    }
}

/// Accumulated classification of a contract and every proxy hop behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractType {
    pub name: Option<ContractKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub standards: Vec<Standard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<ContractProxy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receive: Vec<Standard>,
}

impl ContractType {
    pub fn has_standard(&self, standard: Standard) -> bool {
        self.standards.contains(&standard)
    }

    pub(crate) fn add_standard(&mut self, standard: Standard) {
        if !self.has_standard(standard) {
            self.standards.push(standard);
        }
    }

    pub(crate) fn add_receive(&mut self, standard: Standard) {
        if !self.receive.contains(&standard) {
            self.receive.push(standard);
        }
    }

    pub fn is_proxy(&self) -> bool {
        !self.proxies.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenProperties {
    pub name: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    /// Decimal string; may exceed `u64`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSigProperties {
    pub owners: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc3668Properties {
    pub url: String,
}

/// On-chain properties read once per contract, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContractProperties {
    #[serde(rename = "ERC20")]
    Erc20(TokenProperties),
    #[serde(rename = "ERC721")]
    Erc721(TokenProperties),
    #[serde(rename = "ERC3668")]
    Erc3668(Erc3668Properties),
    GnosisSafe(MultiSigProperties),
    GnosisMultisig(MultiSigProperties),
}

impl ContractProperties {
    pub fn token(&self) -> Option<&TokenProperties> {
        match self {
            Self::Erc20(t) | Self::Erc721(t) => Some(t),
            _ => None,
        }
    }
}
