use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::cache::QuotaCache;
use super::upstream::{should_try_next_base_url, QuotaUpstreamClient};
use crate::error::{QuotaError, QuotaResult};
use crate::models::{AccountCredential, QuotaSnapshot};
use crate::proxy::google::BaseUrlResolver;
use crate::proxy::token::TokenProvider;

/// Cache-first quota lookup for upstream accounts.
///
/// A cache miss costs a token check plus two upstream round trips
/// (loadCodeAssist, then fetchAvailableModels). Successful results and
/// "forbidden" answers from the identity call are cached for the cache TTL;
/// every other failure is returned as-is and leaves the cache untouched.
///
/// Concurrent misses for the same account are not coalesced; each performs the
/// full sequence and the last `put` wins.
pub struct QuotaResolver<P, B> {
    cache: Arc<QuotaCache>,
    upstream: QuotaUpstreamClient,
    tokens: P,
    base_urls: B,
    failover: bool,
}

impl<P, B> QuotaResolver<P, B>
where
    P: TokenProvider,
    B: BaseUrlResolver,
{
    pub fn new(
        cache: Arc<QuotaCache>,
        upstream: QuotaUpstreamClient,
        tokens: P,
        base_urls: B,
    ) -> Self {
        Self {
            cache,
            upstream,
            tokens,
            base_urls,
            failover: false,
        }
    }

    /// When enabled, retryable failures move on to the next candidate base URL
    /// instead of failing on the first one.
    pub fn with_failover(mut self, enabled: bool) -> Self {
        self.failover = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<QuotaCache> {
        &self.cache
    }

    /// Resolves quota for `credential`. A token refresh performed along the way
    /// is not reported back; use
    /// [`resolve_quota_with_credential`](Self::resolve_quota_with_credential)
    /// when the caller persists credentials.
    pub async fn resolve_quota(
        &self,
        cancel: &CancellationToken,
        credential: &AccountCredential,
    ) -> QuotaResult<Arc<QuotaSnapshot>> {
        let mut credential = credential.clone();
        self.resolve_quota_with_credential(cancel, &mut credential).await
    }

    /// Like [`resolve_quota`](Self::resolve_quota), but replaces `credential` in
    /// place as soon as the token provider hands back a refreshed one. The
    /// replacement sticks even when the upstream calls that follow fail.
    pub async fn resolve_quota_with_credential(
        &self,
        cancel: &CancellationToken,
        credential: &mut AccountCredential,
    ) -> QuotaResult<Arc<QuotaSnapshot>> {
        if credential.id.trim().is_empty() {
            return Err(QuotaError::InvalidArgument(
                "credential has no account id".to_string(),
            ));
        }

        if let Some(cached) = self.cache.get(&credential.id) {
            tracing::debug!("quota: using cached data for account {}", credential.id);
            return Ok(cached);
        }

        let ensured = tokio::select! {
            _ = cancel.cancelled() => return Err(QuotaError::Cancelled),
            result = self.tokens.ensure_access_token(&*credential) => result,
        };
        let (token, updated) =
            ensured.map_err(|e| QuotaError::Auth(format!("failed to get access token: {}", e)))?;
        if let Some(updated) = updated {
            tracing::debug!("quota: account {} credential refreshed", credential.id);
            *credential = updated;
        }
        if token.is_empty() {
            return Err(QuotaError::Auth("access token is empty".to_string()));
        }

        let active: &AccountCredential = credential;
        let base_urls = self.base_urls.fallback_order(active);
        if base_urls.is_empty() {
            return Err(QuotaError::Config("no base URLs available".to_string()));
        }
        let candidates = if self.failover {
            &base_urls[..]
        } else {
            &base_urls[..1]
        };

        let snapshot = self.fetch_snapshot(cancel, &token, active, candidates).await?;
        self.cache.put(&active.id, snapshot.clone());
        Ok(snapshot)
    }

    async fn fetch_snapshot(
        &self,
        cancel: &CancellationToken,
        token: &str,
        credential: &AccountCredential,
        candidates: &[String],
    ) -> QuotaResult<Arc<QuotaSnapshot>> {
        let mut last_error = None;

        for (i, base_url) in candidates.iter().enumerate() {
            let has_next = i + 1 < candidates.len();

            let identity = match self.upstream.resolve_identity(cancel, token, base_url).await {
                Ok(identity) => identity,
                Err(e) if e.is_forbidden() => {
                    tracing::warn!(
                        "quota: account {} lacks quota access permission",
                        credential.id
                    );
                    return Ok(Arc::new(QuotaSnapshot::forbidden()));
                }
                Err(e) if has_next && should_try_next_base_url(&e) => {
                    tracing::warn!(
                        "quota: loadCodeAssist failed at {} for account {}: {}, trying next base URL",
                        base_url,
                        credential.id,
                        e
                    );
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let models = match self
                .upstream
                .resolve_model_quotas(cancel, token, &identity.project_id, base_url)
                .await
            {
                Ok(models) => models,
                Err(e) if has_next && should_try_next_base_url(&e) => {
                    tracing::warn!(
                        "quota: fetchAvailableModels failed at {} for account {}: {}, trying next base URL",
                        base_url,
                        credential.id,
                        e
                    );
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            tracing::info!(
                "quota: fetched fresh data for account {} (tier: {}, models: {})",
                credential.id,
                identity.subscription_tier,
                models.len()
            );
            return Ok(Arc::new(QuotaSnapshot::new(
                identity.project_id,
                identity.subscription_tier,
                models,
            )));
        }

        Err(last_error
            .unwrap_or_else(|| QuotaError::Config("no base URLs available".to_string())))
    }

    pub fn invalidate(&self, account_id: &str) {
        self.cache.invalidate(account_id);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// An empty id clears every account, otherwise just the one.
    pub fn clear(&self, account_id: &str) {
        if account_id.is_empty() {
            self.cache.invalidate_all();
        } else {
            self.cache.invalidate(account_id);
        }
    }

    pub fn sweep_expired(&self) -> usize {
        self.cache.sweep()
    }
}
