use std::future::Future;

use crate::models::AccountCredential;

/// Supplies a usable bearer token for an account, refreshing it when needed.
///
/// When a refresh happened the updated credential is returned alongside the
/// token; callers must use it in place of their stale copy. Its `id` is the same.
pub trait TokenProvider: Send + Sync {
    fn ensure_access_token(
        &self,
        credential: &AccountCredential,
    ) -> impl Future<Output = Result<(String, Option<AccountCredential>), String>> + Send;
}

/// Hands out the credential's stored access token as-is. Never refreshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredTokenProvider;

impl TokenProvider for StoredTokenProvider {
    async fn ensure_access_token(
        &self,
        credential: &AccountCredential,
    ) -> Result<(String, Option<AccountCredential>), String> {
        Ok((credential.token.access_token.clone(), None))
    }
}
