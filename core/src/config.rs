//! Shared client settings.
//!
//! # Design
//! `NetworkConfig` is plain data, deserializable from JSON so hosts can
//! keep it next to their other settings. The core never reads it on its
//! own: `Client::from_config` and `BasicEndpoint::from_config` apply it
//! when asked. Every field is optional and falls back to library defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::builder::JsonEncoder;
use crate::http::{Headers, DEFAULT_TIMEOUT};
use crate::logger::LogLevel;
use crate::retry::{RetryPolicy, DEFAULT_RETRY_STATUS_CODES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid network configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("timeout must be a finite, non-negative number of seconds, got {0}")]
    Timeout(f64),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub base_url: Option<Url>,
    pub default_headers: BTreeMap<String, String>,
    pub timeout_secs: Option<f64>,
    pub json: JsonEncoder,
    pub retry: Option<RetrySettings>,
    pub log_level: Option<LogLevel>,
}

/// Serializable form of `RetryPolicy`; omitted fields take the policy defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub jitter_ms: u64,
    pub retry_on: Vec<u16>,
    pub idempotent_only: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            jitter_ms: policy.jitter.as_millis() as u64,
            retry_on: DEFAULT_RETRY_STATUS_CODES.to_vec(),
            idempotent_only: policy.idempotent_only,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(
            settings.max_retries,
            Duration::from_millis(settings.base_delay_ms),
            Duration::from_millis(settings.jitter_ms),
        )
        .retry_on(settings.retry_on.iter().copied())
        .idempotent_only(settings.idempotent_only)
    }
}

impl NetworkConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: NetworkConfig = serde_json::from_str(raw)?;
        if let Some(secs) = config.timeout_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ConfigError::Timeout(secs));
            }
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn default_headers(&self) -> Headers {
        self.default_headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry.as_ref().map(RetryPolicy::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = NetworkConfig::from_json_str("{}").unwrap();
        assert_eq!(config, NetworkConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.retry_policy().is_none());
        assert!(config.default_headers().is_empty());
    }

    #[test]
    fn full_config_parses() {
        let raw = r#"{
            "base_url": "https://api.example.com/v3",
            "default_headers": {"Accept": "application/json"},
            "timeout_secs": 2.5,
            "json": "pretty",
            "retry": {"max_retries": 4, "base_delay_ms": 50, "retry_on": [503]},
            "log_level": "verbose"
        }"#;
        let config = NetworkConfig::from_json_str(raw).unwrap();

        assert_eq!(config.base_url.as_ref().unwrap().as_str(), "https://api.example.com/v3");
        assert_eq!(config.default_headers().get("accept"), Some("application/json"));
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.json, JsonEncoder::Pretty);
        assert_eq!(config.log_level, Some(LogLevel::Verbose));

        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(50));
        assert_eq!(policy.jitter, Duration::from_millis(100));
        assert!(policy.retries_status(503));
        assert!(!policy.retries_status(500));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_timeouts() {
        assert!(matches!(
            NetworkConfig::from_json_str(r#"{"base": "x"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            NetworkConfig::from_json_str(r#"{"timeout_secs": -1}"#),
            Err(ConfigError::Timeout(_))
        ));
    }
}
