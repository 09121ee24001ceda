//! The decoder facade.

use std::sync::Arc;

use alloy_primitives::U256;
use evmdecoder_classify::signatures::{SAFE_TRANSFER_FROM, SAFE_TRANSFER_FROM_BYTES, TRANSFER_FROM};
use evmdecoder_classify::{Classifier, ContractType, Standard};
use evmdecoder_rpc::{AbortHandle, HttpTransport, RpcClient, RpcTransport};
use serde_json::Value;

use crate::abi::{AbiRepository, FunctionCall};
use crate::config::Config;
use crate::contract_info::{ContractInfo, ContractInfoService};
use crate::error::DecoderError;

/// Contract info, classification and call decoding for one endpoint.
///
/// Bytecode fetches go through a queued client that coalesces concurrent
/// calls into batches; classification and property reads use a direct client over the
/// same transport. Both observe one abort handle, tripped by
/// [`EvmDecoder::shutdown`].
///
/// ```no_run
/// use evmdecoder::{AbiRepository, Config, EvmDecoder};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let decoder = EvmDecoder::new(Config::for_url("http://localhost:8545"), AbiRepository::new())?;
/// let info = decoder
///     .contract_info("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
///     .await?;
/// println!("{}", serde_json::to_string(&*info)?);
/// decoder.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct EvmDecoder {
    config: Config,
    client: Arc<RpcClient>,
    classifier: Arc<Classifier>,
    abis: Arc<AbiRepository>,
    contracts: ContractInfoService,
}

impl EvmDecoder {
    /// Decoder over HTTP to `config.eth.url`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: Config, abis: AbiRepository) -> Result<Self, DecoderError> {
        config
            .validate()
            .map_err(|e| DecoderError::Config(e.to_string()))?;
        let transport = HttpTransport::new(config.eth.url.clone(), config.eth.http.transport_config())?;
        Self::with_transport(config, Arc::new(transport), abis)
    }

    /// Decoder over an arbitrary transport; `config.eth.url` is ignored.
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn RpcTransport>,
        abis: AbiRepository,
    ) -> Result<Self, DecoderError> {
        let abort = AbortHandle::new();
        let batch = config.eth.client.batch_config();

        let client = match config.eth.client.queue_config() {
            Some(queue) => RpcClient::queued(transport.clone(), batch.clone(), queue, abort.clone())?,
            None => RpcClient::new(transport.clone(), batch.clone(), abort.clone())?,
        };
        let classification_client = RpcClient::new(transport, batch, abort)?;

        let client = Arc::new(client);
        let classifier = Arc::new(
            Classifier::new(Arc::new(classification_client))
                .with_max_proxy_depth(config.classification.max_proxy_depth),
        );
        let abis = Arc::new(abis);
        let contracts = ContractInfoService::new(
            client.clone(),
            classifier.clone(),
            abis.clone(),
            abis.clone(),
            config.contract_info.max_cache_entries,
        );

        tracing::info!(
            url = %client.transport().url(),
            queued = client.is_queued(),
            abis = abis.len(),
            cache = config.contract_info.max_cache_entries,
            "evm decoder ready"
        );

        Ok(Self {
            config,
            client,
            classifier,
            abis,
            contracts,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The batching client, for callers issuing their own requests.
    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    pub fn abis(&self) -> &AbiRepository {
        &self.abis
    }

    pub async fn contract_info(&self, address: &str) -> Result<Arc<ContractInfo>, DecoderError> {
        self.contracts.contract_info(address).await
    }

    /// Classify already-fetched bytecode.
    pub async fn classify(&self, address: &str, code: &str) -> ContractType {
        self.classifier.classify(address, code, None).await
    }

    /// Decode transaction input sent to `to`.
    ///
    /// With a target, its contract info is resolved first: the ABI bound to
    /// the address or matching its bytecode fingerprint wins over a plain
    /// selector match, and NFT transfers get `extra.tokenUri`.
    pub async fn decode_function_call(
        &self,
        input: &str,
        to: Option<&str>,
    ) -> Result<FunctionCall, DecoderError> {
        let Some(address) = to else {
            return self.abis.decode_function_call(input, None, None);
        };
        let info = self.contract_info(address).await?;
        let mut call = self
            .abis
            .decode_function_call(input, Some(address), info.fingerprint.as_deref())?;

        if is_nft_transfer(input) {
            let token_id = call
                .params
                .get(2)
                .and_then(|p| p.value.as_str())
                .and_then(|v| v.parse::<U256>().ok());
            if let Some(token_id) = token_id {
                if let Some(uri) = self.token_uri_for(address, token_id, &info).await {
                    call.extra.insert("tokenUri".into(), Value::String(uri));
                }
            }
        }
        Ok(call)
    }

    /// Metadata URI of an ERC721 token, if it can be determined.
    pub async fn nft_token_uri(
        &self,
        address: &str,
        token_id: U256,
    ) -> Result<Option<String>, DecoderError> {
        let info = self.contract_info(address).await?;
        Ok(self.token_uri_for(address, token_id, &info).await)
    }

    async fn token_uri_for(
        &self,
        address: &str,
        token_id: U256,
        info: &ContractInfo,
    ) -> Option<String> {
        let contract_type = info.contract_type.as_ref()?;
        if !contract_type.has_standard(Standard::Erc721) {
            return None;
        }
        self.classifier
            .determine_nft_uri(address, token_id, contract_type, info.properties.as_ref())
            .await
    }

    /// Abort every pending wait; later requests fail with `Aborted`.
    pub fn shutdown(&self) {
        tracing::info!("shutting down evm decoder");
        self.abort_handle().abort();
    }

    pub fn is_shut_down(&self) -> bool {
        self.abort_handle().is_aborted()
    }

    fn abort_handle(&self) -> &AbortHandle {
        self.client.abort_handle()
    }
}

/// `transferFrom` or either `safeTransferFrom` overload.
fn is_nft_transfer(input: &str) -> bool {
    let data = input.strip_prefix("0x").unwrap_or(input).to_ascii_lowercase();
    [TRANSFER_FROM, SAFE_TRANSFER_FROM, SAFE_TRANSFER_FROM_BYTES]
        .iter()
        .any(|selector| data.starts_with(selector))
}
