use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::{AccountCredential, TokenData};
use crate::proxy::token::TokenProvider;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Tokens expiring within this window are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 300;

fn env_first(keys: &[&str]) -> Option<String> {
    for k in keys {
        if let Ok(v) = std::env::var(k) {
            let t = v.trim();
            if !t.is_empty() {
                return Some(t.to_string());
            }
        }
    }
    None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Google OAuth refresh-token flow.
#[derive(Clone)]
pub struct OAuthTokenProvider {
    client: Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl OAuthTokenProvider {
    /// Client credentials come from `GEPHYR_GOOGLE_OAUTH_CLIENT_ID` and
    /// `GEPHYR_GOOGLE_OAUTH_CLIENT_SECRET` (or the `GOOGLE_OAUTH_*` fallbacks).
    pub fn from_env(client: Client) -> Self {
        Self {
            client,
            token_url: TOKEN_URL.to_string(),
            client_id: env_first(&["GEPHYR_GOOGLE_OAUTH_CLIENT_ID", "GOOGLE_OAUTH_CLIENT_ID"]),
            client_secret: env_first(&[
                "GEPHYR_GOOGLE_OAUTH_CLIENT_SECRET",
                "GOOGLE_OAUTH_CLIENT_SECRET",
            ]),
        }
    }

    pub fn with_client_credentials(mut self, client_id: String, secret: Option<String>) -> Self {
        self.client_id = Some(client_id);
        self.client_secret = secret;
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        account_id: &str,
    ) -> Result<TokenResponse, String> {
        let cid = self.client_id.clone().ok_or_else(|| {
            "Missing Google OAuth client_id. Set GEPHYR_GOOGLE_OAUTH_CLIENT_ID.".to_string()
        })?;
        let mut params: Vec<(&str, String)> = vec![
            ("client_id", cid),
            ("refresh_token", refresh_token.to_string()),
            ("grant_type", "refresh_token".to_string()),
        ];
        if let Some(s) = self.client_secret.clone() {
            params.push(("client_secret", s));
        }

        tracing::info!("Refreshing token for account: {}", account_id);

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    format!("Refresh request failed: {}. Unable to reach the Google authorization server, check proxy settings.", e)
                } else {
                    format!("Refresh request failed: {}", e)
                }
            })?;

        if response.status().is_success() {
            let token_data = response
                .json::<TokenResponse>()
                .await
                .map_err(|e| format!("Refresh data parsing failed: {}", e))?;
            tracing::info!(
                "Token refreshed for account {} (expires in {}s)",
                account_id,
                token_data.expires_in
            );
            Ok(token_data)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(format!("Refresh failed ({}): {}", status, error_text))
        }
    }
}

impl TokenProvider for OAuthTokenProvider {
    async fn ensure_access_token(
        &self,
        credential: &AccountCredential,
    ) -> Result<(String, Option<AccountCredential>), String> {
        if credential.token.is_fresh(REFRESH_MARGIN_SECS) {
            return Ok((credential.token.access_token.clone(), None));
        }

        tracing::debug!(
            "Token expiring soon for account {}, refreshing...",
            credential.id
        );
        let response = self
            .refresh_access_token(&credential.token.refresh_token, &credential.id)
            .await?;

        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| credential.token.refresh_token.clone());
        let token = TokenData::new(
            response.access_token,
            refresh_token,
            response.expires_in,
            credential.token.email.clone(),
            credential.token.project_id.clone(),
        );
        let access_token = token.access_token.clone();
        Ok((access_token, Some(credential.with_token(token))))
    }
}
