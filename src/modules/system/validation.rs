use crate::models::QuotaConfig;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
    pub actual_value: Option<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual_value {
            Some(val) => write!(f, "  • {}: {} (got: {})", self.field, self.message, val),
            None => write!(f, "  • {}: {}", self.field, self.message),
        }
    }
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: None,
        }
    }

    fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: Some(value.to_string()),
        }
    }
}

/// Upper bound for the cache TTL and the sweep interval (one week).
pub const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

pub fn validate_quota_config(config: &QuotaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.cache_ttl_secs == 0 {
        errors.push(ConfigError::new(
            "cache_ttl_secs",
            "must be greater than 0",
        ));
    }
    if config.cache_ttl_secs > MAX_CACHE_TTL_SECS {
        errors.push(ConfigError::with_value(
            "cache_ttl_secs",
            format!("must not exceed {}", MAX_CACHE_TTL_SECS),
            config.cache_ttl_secs.to_string(),
        ));
    }
    if config.sweep_interval_secs > MAX_CACHE_TTL_SECS {
        errors.push(ConfigError::with_value(
            "sweep_interval_secs",
            format!("must not exceed {}", MAX_CACHE_TTL_SECS),
            config.sweep_interval_secs.to_string(),
        ));
    }
    if config.request_timeout_secs == 0 {
        errors.push(ConfigError::new(
            "request_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.base_urls.iter().all(|u| u.trim().is_empty()) {
        errors.push(ConfigError::new(
            "base_urls",
            "must contain at least one upstream base URL",
        ));
    }
    for (i, raw) in config.base_urls.iter().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        match reqwest::Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ConfigError::with_value(
                format!("base_urls[{}]", i),
                "must be an absolute http(s) URL",
                raw,
            )),
        }
    }

    if config.upstream_proxy.enabled && config.upstream_proxy.url.trim().is_empty() {
        errors.push(ConfigError::new(
            "upstream_proxy.url",
            "must be set when the upstream proxy is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
