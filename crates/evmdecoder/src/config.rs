//! Decoder configuration.
//!
//! Every section is `#[serde(default)]`, so a partial JSON document only
//! overrides what it names.

use std::path::Path;
use std::time::Duration;

use evmdecoder_rpc::{Backoff, BatchConfig, HttpTransportConfig, QueueConfig, RetryConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::observability::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub eth: EthConfig,
    pub contract_info: ContractInfoConfig,
    pub classification: ClassificationConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthConfig {
    /// JSON-RPC endpoint, e.g. "http://localhost:8545"
    pub url: String,
    pub http: HttpConfig,
    pub client: ClientConfig,
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub validate_certificate: bool,
    pub max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            validate_certificate: false,
            max_idle_per_host: 256,
        }
    }
}

impl HttpConfig {
    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            request_timeout: Duration::from_millis(self.timeout_ms),
            validate_certificate: self.validate_certificate,
            max_idle_per_host: self.max_idle_per_host,
        }
    }
}

/// Batching, retry and queueing behaviour of the RPC client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Calls per batch; `<= 1` disables queueing.
    pub max_batch_size: usize,
    /// Max wait before a partial batch is flushed.
    pub max_batch_time_ms: u64,
    pub max_retry_attempts: u32,
    /// Linear backoff step between retries.
    pub retry_step_ms: u64,
    pub max_retry_time_ms: u64,
    pub max_batch_splits: usize,
    pub max_missing_attempts: u32,
    pub individual_concurrency: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            max_batch_time_ms: 0,
            max_retry_attempts: 10,
            retry_step_ms: 2_500,
            max_retry_time_ms: 120_000,
            max_batch_splits: 10,
            max_missing_attempts: 5,
            individual_concurrency: 5,
        }
    }
}

impl ClientConfig {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            retry: RetryConfig {
                max_attempts: self.max_retry_attempts,
                backoff: Backoff::Linear {
                    min: Duration::ZERO,
                    step: Duration::from_millis(self.retry_step_ms),
                    max: Duration::from_millis(self.max_retry_time_ms),
                },
            },
            max_splits: self.max_batch_splits,
            max_missing_attempts: self.max_missing_attempts,
            individual_concurrency: self.individual_concurrency,
        }
    }

    /// `None` when queueing is disabled.
    pub fn queue_config(&self) -> Option<QueueConfig> {
        (self.max_batch_size > 1).then(|| QueueConfig {
            max_batch_size: self.max_batch_size,
            max_batch_time: Duration::from_millis(self.max_batch_time_ms),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractInfoConfig {
    /// LRU capacity; 0 disables caching.
    pub max_cache_entries: usize,
}

impl Default for ContractInfoConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 25_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub max_proxy_depth: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            max_proxy_depth: evmdecoder_classify::DEFAULT_MAX_PROXY_DEPTH,
        }
    }
}

impl Config {
    /// Defaults with the given endpoint.
    pub fn for_url(url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.eth.url = url.into();
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.eth.url.trim().is_empty() {
            return Err(ConfigError::Invalid("eth.url must be set".into()));
        }
        let client = &self.eth.client;
        if client.max_batch_splits < 1 {
            return Err(ConfigError::Invalid(
                "eth.client.max_batch_splits can't be less than 1".into(),
            ));
        }
        if client.max_retry_attempts < 1 {
            return Err(ConfigError::Invalid(
                "eth.client.max_retry_attempts can't be less than 1".into(),
            ));
        }
        if client.individual_concurrency < 1 {
            return Err(ConfigError::Invalid(
                "eth.client.individual_concurrency can't be less than 1".into(),
            ));
        }
        Ok(())
    }
}
