//! Per-address contract info with at most one computation in flight.
//!
//! The cache stores the shared future of each computation rather than its
//! result, so concurrent callers for the same address await one fetch. A
//! failed computation is evicted so the next caller retries.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use evmdecoder_classify::{
    extract_functions_and_events, Classifier, ContractNameLookup, ContractProperties,
    ContractType, SignatureMatcher,
};
use evmdecoder_rpc::{requests, RpcClient};
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::error::DecoderError;

/// Everything known about one address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub is_contract: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<ContractType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ContractProperties>,
}

type InfoResult = Result<Arc<ContractInfo>, DecoderError>;
type SharedInfo = Shared<BoxFuture<'static, InfoResult>>;

struct Sources {
    /// Client used for bytecode fetches.
    client: Arc<RpcClient>,
    classifier: Arc<Classifier>,
    matcher: Arc<dyn SignatureMatcher>,
    names: Arc<dyn ContractNameLookup>,
}

/// Contract info orchestrator backed by a bounded LRU.
pub struct ContractInfoService {
    sources: Arc<Sources>,
    /// `None` when caching is disabled.
    cache: Option<Mutex<LruCache<String, SharedInfo>>>,
}

impl ContractInfoService {
    pub fn new(
        client: Arc<RpcClient>,
        classifier: Arc<Classifier>,
        matcher: Arc<dyn SignatureMatcher>,
        names: Arc<dyn ContractNameLookup>,
        max_cache_entries: usize,
    ) -> Self {
        Self {
            sources: Arc::new(Sources {
                client,
                classifier,
                matcher,
                names,
            }),
            cache: NonZeroUsize::new(max_cache_entries).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Contract info for `address`, computed at most once while cached.
    pub async fn contract_info(&self, address: &str) -> InfoResult {
        let Some(cache) = &self.cache else {
            return compute(self.sources.clone(), address.to_string()).await;
        };

        let key = address.to_ascii_lowercase();
        let pending = {
            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            match cache.get(&key) {
                Some(pending) => pending.clone(),
                None => {
                    let pending = compute(self.sources.clone(), address.to_string())
                        .boxed()
                        .shared();
                    cache.put(key.clone(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;
        if result.is_err() {
            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            if cache.peek(&key).is_some_and(|cached| cached.ptr_eq(&pending)) {
                cache.pop(&key);
            }
        }
        result
    }
}

async fn compute(sources: Arc<Sources>, address: String) -> InfoResult {
    let code = sources.client.request(requests::get_code(&address)).await?;
    if evmdecoder_classify::detect::is_wallet(&code) {
        return Ok(Arc::new(ContractInfo::default()));
    }

    let found = extract_functions_and_events(&code, Some(&address), sources.matcher.as_ref());
    let fingerprint = found.fingerprint();
    let contract_name = sources.names.contract_name(&address, fingerprint.as_deref());
    let contract_type = sources.classifier.classify(&address, &code, None).await;

    let properties = match sources
        .classifier
        .get_contract_properties(&address, &contract_type)
        .await
    {
        Ok(properties) => properties,
        Err(e) => {
            tracing::warn!(%address, error = %e, "failed to retrieve contract properties");
            None
        }
    };

    tracing::debug!(
        %address,
        fingerprint = ?fingerprint,
        name = ?contract_type.name,
        proxy = contract_type.is_proxy(),
        "contract info computed"
    );

    Ok(Arc::new(ContractInfo {
        is_contract: true,
        fingerprint,
        contract_name,
        contract_type: Some(contract_type),
        properties,
    }))
}
