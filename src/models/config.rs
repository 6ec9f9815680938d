use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;

// Cloud Code v1internal hosts, in fallback order: Sandbox, Daily, Prod.
pub const BASE_URL_SANDBOX: &str = "https://daily-cloudcode-pa.sandbox.googleapis.com";
pub const BASE_URL_DAILY: &str = "https://daily-cloudcode-pa.googleapis.com";
pub const BASE_URL_PROD: &str = "https://cloudcode-pa.googleapis.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// 0 means half the cache TTL.
    #[serde(default)]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_base_urls")]
    pub base_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,
    #[serde(default)]
    pub failover_base_urls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_base_urls() -> Vec<String> {
    vec![
        BASE_URL_SANDBOX.to_string(),
        BASE_URL_DAILY.to_string(),
        BASE_URL_PROD.to_string(),
    ]
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl QuotaConfig {
    pub fn new() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: 0,
            base_urls: default_base_urls(),
            user_agent: None,
            request_timeout_secs: default_request_timeout_secs(),
            upstream_proxy: UpstreamProxyConfig::default(),
            failover_base_urls: false,
            log_dir: None,
        }
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        if self.sweep_interval_secs > 0 {
            std::time::Duration::from_secs(self.sweep_interval_secs)
        } else {
            std::time::Duration::from_secs((self.cache_ttl_secs / 2).max(1))
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamProxyConfig {
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
}
