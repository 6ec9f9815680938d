use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{QuotaCache, QuotaResolver, QuotaUpstreamClient};
use crate::error::{QuotaError, QuotaResult};
use crate::models::QuotaConfig;
use crate::modules::system::{scheduler, validation};
use crate::proxy::google::ConfiguredBaseUrls;
use crate::proxy::token::OAuthTokenProvider;

pub type DefaultQuotaResolver = QuotaResolver<OAuthTokenProvider, ConfiguredBaseUrls>;

/// Wires the production collaborators: OAuth refresh, configured base URLs and
/// a proxy-aware HTTP client.
pub fn build_resolver(config: &QuotaConfig) -> QuotaResult<DefaultQuotaResolver> {
    validation::validate_quota_config(config).map_err(|errors| {
        QuotaError::Config(format!(
            "configuration_validation_failed:\n{}",
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        ))
    })?;

    let client = crate::utils::http::build_client(config)?;
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| crate::constants::USER_AGENT.clone());

    let resolver = QuotaResolver::new(
        Arc::new(QuotaCache::new(config.cache_ttl())),
        QuotaUpstreamClient::new(client.clone(), user_agent),
        OAuthTokenProvider::from_env(client),
        ConfiguredBaseUrls::new(config.base_urls.clone()),
    )
    .with_failover(config.failover_base_urls);
    Ok(resolver)
}

/// A resolver plus its background sweeper.
pub struct QuotaService {
    resolver: Arc<DefaultQuotaResolver>,
    cancel: CancellationToken,
    sweeper: Option<JoinHandle<()>>,
}

impl QuotaService {
    /// Must be called from within a tokio runtime.
    pub fn start(config: &QuotaConfig) -> QuotaResult<Self> {
        let resolver = Arc::new(build_resolver(config)?);
        let cancel = CancellationToken::new();
        let sweeper = scheduler::start_quota_sweeper(
            resolver.cache().clone(),
            config.sweep_interval(),
            cancel.child_token(),
        );
        tracing::info!(
            "Quota service started (ttl: {}s, failover: {})",
            config.cache_ttl_secs,
            config.failover_base_urls
        );
        Ok(Self {
            resolver,
            cancel,
            sweeper: Some(sweeper),
        })
    }

    pub fn resolver(&self) -> &Arc<DefaultQuotaResolver> {
        &self.resolver
    }

    /// Token that parents every resolution started through this service.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub async fn shutdown(mut self, timeout: Duration) {
        tracing::info!("Shutting down quota service...");
        self.cancel.cancel();

        let Some(handle) = self.sweeper.take() else {
            return;
        };
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => tracing::info!("Quota sweeper stopped"),
            Ok(Err(e)) => tracing::warn!("Quota sweeper error: {}", e),
            Err(_) => tracing::warn!(
                "Quota sweeper did not stop within {:?}, leaving it detached",
                timeout
            ),
        }
    }
}

impl Drop for QuotaService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
