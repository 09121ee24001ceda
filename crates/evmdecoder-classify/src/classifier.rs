//! Contract classification.
//!
//! A classification pass inspects one contract's bytecode and folds what it
//! finds into the accumulated [`ContractType`]. When a pass discovers a new
//! proxy with a known target, the target's bytecode is fetched and classified
//! next, so standards and proxies accumulate along the whole chain.

use std::collections::HashSet;
use std::sync::Arc;

use evmdecoder_rpc::{requests, RpcClient};

use crate::codec;
use crate::detect;
use crate::proxy;
use crate::signatures::{
    EIP1822_PROXIABLE_SLOT, EIP1967_IMPL_SLOT, GNOSIS_SAFE_STORAGE_SLOT, IMPLEMENTATION,
    OPEN_ZEPPELIN_IMPL_SLOT, POLYGON_IMPL_SLOT, PROXIABLE_UUID,
};
use crate::types::{ContractKind, ContractProxy, ContractType, Standard};

pub const DEFAULT_MAX_PROXY_DEPTH: usize = 8;

/// Classifies contracts from bytecode, resolving proxies over RPC.
pub struct Classifier {
    pub(crate) client: Arc<RpcClient>,
    max_proxy_depth: usize,
}

impl Classifier {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            max_proxy_depth: DEFAULT_MAX_PROXY_DEPTH,
        }
    }

    /// Maximum number of proxy hops followed after the first contract.
    pub fn with_max_proxy_depth(mut self, depth: usize) -> Self {
        self.max_proxy_depth = depth;
        self
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    /// Classify `address` given its bytecode, extending `prior` if supplied.
    ///
    /// Never fails: RPC errors while resolving a proxy end the chain there and
    /// the partial result is returned.
    pub async fn classify(
        &self,
        address: &str,
        code: &str,
        prior: Option<ContractType>,
    ) -> ContractType {
        let mut contract_type = prior.unwrap_or_default();
        let mut address = address.to_string();
        let mut code = code.to_ascii_lowercase();
        let mut visited = HashSet::new();
        let mut hops = 0;

        loop {
            visited.insert(address.to_ascii_lowercase());
            let known_proxies = contract_type.proxies.len();
            contract_type = self.classify_pass(&address, &code, contract_type).await;

            if contract_type.proxies.len() == known_proxies {
                break;
            }
            let Some(target) = contract_type.proxies.last().and_then(|p| p.target.clone()) else {
                break;
            };
            if visited.contains(&target.to_ascii_lowercase()) {
                tracing::warn!(%address, %target, "proxy cycle detected, stopping resolution");
                break;
            }
            if hops == self.max_proxy_depth {
                tracing::warn!(%address, %target, hops, "proxy chain too deep, stopping resolution");
                break;
            }
            hops += 1;

            match self.client.request(requests::get_code(&target)).await {
                Ok(next) if !detect::is_wallet(&next) => {
                    address = target;
                    code = next.to_ascii_lowercase();
                }
                Ok(_) => {
                    tracing::debug!(%target, "proxy target has no code");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        %target,
                        error = %e,
                        "unable to get next contract in proxy chain"
                    );
                    break;
                }
            }
        }
        contract_type
    }

    /// One pass over a single contract's bytecode.
    async fn classify_pass(&self, address: &str, code: &str, mut ct: ContractType) -> ContractType {
        if detect::is_erc897_proxy(code) {
            tracing::debug!(address, "ERC897 proxy detected");
            if detect::uses_open_zeppelin_storage_slot(code) {
                let target = self.implementation_from_storage(address, OPEN_ZEPPELIN_IMPL_SLOT).await;
                ct.proxies.push(ContractProxy::new(address, Some(Standard::Erc897), target));
            } else if detect::uses_polygon_storage_slot(code) {
                let target = self.implementation_from_storage(address, POLYGON_IMPL_SLOT).await;
                ct.proxies.push(
                    ContractProxy::new(address, Some(Standard::Erc897), target).sub_type("Polygon"),
                );
            } else if let Some(target) = self.implementation_address(address).await {
                ct.proxies.push(ContractProxy::new(address, Some(Standard::Erc897), Some(target)));
            }
        }

        if detect::is_erc1822_proxy(code) {
            tracing::debug!(address, "ERC1822 proxy detected");
            if detect::uses_eip1822_storage_slot(code) {
                let target = self.implementation_from_storage(address, EIP1822_PROXIABLE_SLOT).await;
                ct.proxies.push(ContractProxy::new(address, Some(Standard::Erc1822), target));
            } else if let Some(slot) = self.proxiable_uuid(address).await {
                if let Some(target) = self.implementation_from_storage(address, &slot).await {
                    ct.proxies.push(ContractProxy::new(address, Some(Standard::Erc1822), Some(target)));
                }
            }
        }

        if detect::is_erc1967_proxy(code) {
            tracing::debug!(address, "ERC1967 proxy detected");
            if detect::uses_eip1967_storage_slot(code) {
                let target = self.implementation_from_storage(address, EIP1967_IMPL_SLOT).await;
                ct.proxies.push(ContractProxy::new(address, Some(Standard::Erc1967), target));
            } else if let Some(target) = self.implementation_address(address).await {
                ct.proxies.push(ContractProxy::new(address, Some(Standard::Erc1967), Some(target)));
            }
        }

        if detect::is_clone(code) {
            let target = proxy::cloned_target(code);
            if detect::is_minimal_proxy_clone(code) {
                ct.proxies.push(
                    ContractProxy::new(address, Some(Standard::Erc1167), target.clone()).sub_type("Clone"),
                );
            }
            if detect::is_meta_proxy_clone(code) {
                ct.proxies.push(
                    ContractProxy::new(address, Some(Standard::Erc3448), target.clone()).sub_type("Clone"),
                );
            }
            if detect::is_simple_multisig_clone(code) {
                ct.proxies
                    .push(ContractProxy::new(address, None, target).sub_type("Clone (Simple MultiSig)"));
            }
        }

        if detect::is_gnosis_safe(code) {
            let target = self.implementation_from_storage(address, GNOSIS_SAFE_STORAGE_SLOT).await;
            ct.proxies.push(ContractProxy::new(address, None, target).sub_type("GnosisSafe"));
            ct.name = Some(ContractKind::GnosisSafe);
        }

        if detect::is_old_gnosis_multisig(code) {
            ct.name = Some(ContractKind::GnosisMultisig);
            ct.sub_type = Some("Deprecated".into());
        }

        if detect::is_diamond_proxy(code) {
            ct.name = Some(ContractKind::DiamondProxy);
            ct.add_standard(Standard::Erc2535);
        }

        if detect::is_erc20_contract_code(code) {
            ct.name = Some(ContractKind::Token);
            ct.add_standard(Standard::Erc20);
        }

        if detect::is_erc721_contract_code(code) {
            ct.name = Some(ContractKind::Nft);
            ct.add_standard(Standard::Erc721);
            ct.metadata = Some(detect::has_erc721_metadata_extension(code));
            ct.base_uri = Some(detect::has_erc721_base_uri_support(code));
            ct.enumeration = Some(detect::has_erc721_enumeration_extension(code));
            ct.token_uri = Some(detect::has_erc721_token_uri_support(code));
        }

        if detect::is_erc1155_contract_code(code) {
            ct.name = Some(ContractKind::MultiToken);
            ct.add_standard(Standard::Erc1155);
            ct.metadata = Some(detect::has_erc1155_metadata_extension(code));
        }

        if detect::is_flash_loan_lender(code) {
            let sub_type = if detect::is_flash_loan_receiver(code) {
                "Lender/Receiver"
            } else {
                "Lender"
            };
            ct.name = Some(ContractKind::FlashLoan);
            ct.sub_type = Some(sub_type.into());
            ct.add_standard(Standard::Erc3156);
        }

        if detect::is_erc721_receiver(code) {
            ct.add_receive(Standard::Erc721);
        }
        if detect::is_erc1155_receiver(code) {
            ct.add_receive(Standard::Erc1155);
        }
        if detect::is_flash_loan_receiver(code) {
            ct.add_receive(Standard::Erc3156);
        }

        if detect::is_erc1820_registry(code) {
            ct.name = Some(ContractKind::ContractRegistry);
            ct.add_standard(Standard::Erc1820);
        }

        if detect::is_erc3668(code) {
            ct.name = Some(ContractKind::OffchainResolver);
            ct.add_standard(Standard::Erc3668);
        }

        ct
    }

    async fn implementation_from_storage(&self, address: &str, slot: &str) -> Option<String> {
        match self.client.request(requests::get_storage_at(address, slot)).await {
            Ok(word) => proxy::storage_to_address(&word),
            Err(e) => {
                tracing::warn!(address, slot, error = %e, "failed to read implementation slot");
                None
            }
        }
    }

    /// `implementation()` of an EIP-897/1967 proxy, lowercased like every
    /// other proxy target.
    async fn implementation_address(&self, address: &str) -> Option<String> {
        let raw = match self.client.request(requests::call(address, IMPLEMENTATION)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(address, error = %e, "couldn't get proxied implementation address");
                return None;
            }
        };
        match codec::decode_address(&raw) {
            Ok(target) if target != ZERO_ADDRESS => Some(target.to_ascii_lowercase()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(address, error = %e, "implementation() returned garbage");
                None
            }
        }
    }

    /// Storage slot reported by a UUPS proxy's `proxiableUUID()`.
    async fn proxiable_uuid(&self, address: &str) -> Option<String> {
        match self.client.request(requests::call(address, PROXIABLE_UUID)).await {
            Ok(raw) => match codec::decode_response(&raw, codec::OutputType::Hex) {
                Ok(codec::Decoded::Hex(slot)) if slot.len() > 2 => Some(slot),
                _ => None,
            },
            Err(e) => {
                tracing::warn!(address, error = %e, "couldn't get storage slot");
                None
            }
        }
    }
}

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
