//! Read-only property calls for classified contracts.

use alloy_primitives::U256;
use evmdecoder_rpc::requests;

use crate::classifier::Classifier;
use crate::codec;
use crate::error::ClassifyError;
use crate::signatures::{
    BASE_URI, DECIMALS, ERC3668_URL, GNOSIS_GET_OWNERS, NAME, SYMBOL, TOKEN_BY_INDEX, TOKEN_URI,
    TOTAL_SUPPLY,
};
use crate::types::{
    ContractKind, ContractProperties, ContractType, Erc3668Properties, MultiSigProperties, Standard,
    TokenProperties,
};

impl Classifier {
    /// Token, resolver or multisig properties for a classified contract.
    ///
    /// `Ok(None)` when the type carries nothing worth reading. Any failed
    /// call fails the whole property set.
    pub async fn get_contract_properties(
        &self,
        address: &str,
        contract_type: &ContractType,
    ) -> Result<Option<ContractProperties>, ClassifyError> {
        if contract_type.has_standard(Standard::Erc20) {
            let raw = self
                .client
                .request_batch(vec![
                    requests::call(address, NAME),
                    requests::call(address, SYMBOL),
                    requests::call(address, DECIMALS),
                ])
                .await?;
            let [name, symbol, decimals]: [String; 3] = raw
                .try_into()
                .map_err(|_| ClassifyError::Decode("short ERC20 property batch".into()))?;
            let decimals = codec::decode_uint256(&decimals)?;
            return Ok(Some(ContractProperties::Erc20(TokenProperties {
                name: codec::decode_string(&name)?,
                symbol: codec::decode_string(&symbol)?,
                decimals: u128::try_from(decimals).ok().and_then(|d| u32::try_from(d).ok()),
                base_uri: None,
                total_supply: None,
            })));
        }

        if contract_type.has_standard(Standard::Erc721) {
            let name = self.call_string(address, NAME).await?;
            let symbol = self.call_string(address, SYMBOL).await?;
            let base_uri = match contract_type.base_uri {
                Some(true) => Some(self.call_string(address, BASE_URI).await?),
                _ => None,
            };
            let total_supply = match contract_type.enumeration {
                Some(true) => Some(self.call_uint(address, TOTAL_SUPPLY).await?.to_string()),
                _ => None,
            };
            return Ok(Some(ContractProperties::Erc721(TokenProperties {
                name,
                symbol,
                decimals: None,
                base_uri,
                total_supply,
            })));
        }

        if contract_type.has_standard(Standard::Erc3668) {
            let url = self.call_string(address, ERC3668_URL).await?;
            return Ok(Some(ContractProperties::Erc3668(Erc3668Properties { url })));
        }

        match contract_type.name {
            Some(kind) if kind.is_gnosis() => {
                let raw = self.client.request(requests::call(address, GNOSIS_GET_OWNERS)).await?;
                let owners = MultiSigProperties {
                    owners: codec::decode_address_array(&raw)?,
                };
                Ok(Some(if kind == ContractKind::GnosisSafe {
                    ContractProperties::GnosisSafe(owners)
                } else {
                    ContractProperties::GnosisMultisig(owners)
                }))
            }
            _ => Ok(None),
        }
    }

    /// `tokenByIndex(index)` of an enumerable ERC721.
    pub async fn nft_token_id(&self, address: &str, index: U256) -> Option<U256> {
        let data = with_word(TOKEN_BY_INDEX, index);
        match self.call_uint(address, &data).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(address, %index, error = %e, "couldn't get NFT id");
                None
            }
        }
    }

    /// `tokenURI(id)`; `None` on failure or an empty URI.
    pub async fn nft_token_uri(&self, address: &str, token_id: U256) -> Option<String> {
        let data = with_word(TOKEN_URI, token_id);
        match self.call_string(address, &data).await {
            Ok(uri) if !uri.is_empty() => Some(uri),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(address, %token_id, error = %e, "couldn't get NFT URI");
                None
            }
        }
    }

    /// Best-effort metadata URI for an ERC721 token.
    ///
    /// Prefers `tokenURI(id)` and falls back to `baseURI/id` when the
    /// contract exposes a base URI. For enumerable collections `token` is
    /// first treated as an index and resolved through `tokenByIndex`.
    pub async fn determine_nft_uri(
        &self,
        address: &str,
        token: U256,
        contract_type: &ContractType,
        properties: Option<&ContractProperties>,
    ) -> Option<String> {
        let base_uri = properties
            .and_then(ContractProperties::token)
            .and_then(|t| t.base_uri.as_deref())
            .filter(|b| !b.is_empty());
        if let (Some(true), Some(base_uri)) = (contract_type.base_uri, base_uri) {
            if let Some(uri) = self.nft_token_uri(address, token).await {
                return Some(uri);
            }
            let slash = if base_uri.ends_with('/') { "" } else { "/" };
            return Some(format!("{base_uri}{slash}{token}"));
        }

        let token_id = match contract_type.enumeration {
            Some(true) => self.nft_token_id(address, token).await.unwrap_or(token),
            _ => token,
        };
        if contract_type.token_uri == Some(true) {
            return self.nft_token_uri(address, token_id).await;
        }
        None
    }

    async fn call_string(&self, address: &str, data: &str) -> Result<String, ClassifyError> {
        let raw = self.client.request(requests::call(address, data)).await?;
        codec::decode_string(&raw)
    }

    async fn call_uint(&self, address: &str, data: &str) -> Result<U256, ClassifyError> {
        let raw = self.client.request(requests::call(address, data)).await?;
        codec::decode_uint256(&raw)
    }
}

/// Selector followed by one uint256 argument.
fn with_word(selector: &str, value: U256) -> String {
    let word = codec::encode_uint256(value);
    format!("{selector}{}", word.trim_start_matches("0x"))
}
