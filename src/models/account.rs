use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub expiry_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl TokenData {
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        email: Option<String>,
        project_id: Option<String>,
    ) -> Self {
        let expiry_timestamp = chrono::Utc::now().timestamp() + expires_in;
        Self {
            access_token,
            refresh_token,
            expires_in,
            expiry_timestamp,
            email,
            project_id,
        }
    }

    /// True when the access token is still usable `margin_secs` from now.
    pub fn is_fresh(&self, margin_secs: i64) -> bool {
        !self.access_token.is_empty()
            && self.expiry_timestamp > chrono::Utc::now().timestamp() + margin_secs
    }
}

/// An upstream account as seen by the quota subsystem. `id` is the stable cache
/// key and survives token refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCredential {
    pub id: String,
    pub email: String,
    pub token: TokenData,
    /// Per-account upstream base URL, tried before the configured list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl AccountCredential {
    pub fn new(id: impl Into<String>, email: impl Into<String>, token: TokenData) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            token,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Returns a copy carrying a refreshed token. The account id never changes.
    pub fn with_token(&self, token: TokenData) -> Self {
        Self {
            token,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness_respects_margin() {
        let token = TokenData::new("atk".into(), "rtk".into(), 600, None, None);
        assert!(token.is_fresh(300));
        assert!(!token.is_fresh(900));

        let empty = TokenData::new(String::new(), "rtk".into(), 3600, None, None);
        assert!(!empty.is_fresh(0));
    }

    #[test]
    fn test_with_token_keeps_identity() {
        let original = AccountCredential::new(
            "acct-1",
            "a@test.com",
            TokenData::new("old".into(), "rtk".into(), 10, None, None),
        )
        .with_base_url("https://example.com");
        let refreshed =
            original.with_token(TokenData::new("new".into(), "rtk".into(), 3600, None, None));

        assert_eq!(refreshed.id, original.id);
        assert_eq!(refreshed.base_url, original.base_url);
        assert_eq!(refreshed.token.access_token, "new");
    }

    #[test]
    fn test_credential_deserializes_without_optional_fields() {
        let now = chrono::Utc::now().timestamp();
        let json = serde_json::json!({
            "id": "acc1",
            "email": "a@test.com",
            "token": {
                "access_token": "atk",
                "refresh_token": "rtk",
                "expires_in": 3600,
                "expiry_timestamp": now + 3600
            }
        });
        let credential: AccountCredential = serde_json::from_value(json).unwrap();
        assert_eq!(credential.id, "acc1");
        assert!(credential.base_url.is_none());
        assert!(credential.token.project_id.is_none());
    }
}
