use std::fs;
use std::path::Path;

use crate::error::{QuotaError, QuotaResult};
use crate::models::QuotaConfig;

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {} value: {}", key, raw);
            None
        }
    }
}

/// Reads the JSON config at `path`; a missing file means defaults.
pub fn load_config(path: &Path) -> QuotaResult<QuotaConfig> {
    if !path.exists() {
        tracing::info!(
            "Quota config {} not found, using defaults",
            path.display()
        );
        return Ok(QuotaConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| QuotaError::Config(format!("failed_to_read_config_file: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| QuotaError::Config(format!("failed_to_parse_config_file: {}", e)))
}

pub fn save_config(path: &Path, config: &QuotaConfig) -> QuotaResult<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| QuotaError::Config(format!("failed_to_serialize_config: {}", e)))?;
    fs::write(path, content)
        .map_err(|e| QuotaError::Config(format!("failed_to_save_config: {}", e)))
}

pub fn apply_env_overrides(config: &mut QuotaConfig) {
    if let Some(ttl) = parse_env_u64("GEPHYR_QUOTA_CACHE_TTL_SECS") {
        tracing::info!("Using quota cache TTL from environment: {}s", ttl);
        config.cache_ttl_secs = ttl;
    }

    if let Some(interval) = parse_env_u64("GEPHYR_QUOTA_SWEEP_INTERVAL_SECS") {
        config.sweep_interval_secs = interval;
    }

    if let Ok(raw) = std::env::var("GEPHYR_QUOTA_BASE_URLS") {
        let urls: Vec<String> = raw
            .split(',')
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            tracing::warn!("Ignoring empty GEPHYR_QUOTA_BASE_URLS");
        } else {
            tracing::info!("Using {} quota base URL(s) from environment", urls.len());
            config.base_urls = urls;
        }
    }

    if let Ok(ua) = std::env::var("GEPHYR_QUOTA_USER_AGENT") {
        if !ua.trim().is_empty() {
            config.user_agent = Some(ua.trim().to_string());
        }
    }

    if let Ok(raw) = std::env::var("GEPHYR_QUOTA_FAILOVER") {
        match parse_env_bool(&raw) {
            Some(enabled) => config.failover_base_urls = enabled,
            None => tracing::warn!("Ignoring invalid GEPHYR_QUOTA_FAILOVER value: {}", raw),
        }
    }
}
