use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuotaError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Quota resolution cancelled")]
    Cancelled,
}

impl QuotaError {
    /// The upstream explicitly denied quota visibility for this account.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, QuotaError::Upstream { status: 403, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            QuotaError::Upstream { status, .. } => Some(*status),
            QuotaError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl Serialize for QuotaError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type QuotaResult<T> = Result<T, QuotaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_is_structured_on_status() {
        let err = QuotaError::Upstream {
            status: 403,
            body: "PERMISSION_DENIED".to_string(),
        };
        assert!(err.is_forbidden());
        assert_eq!(err.status(), Some(403));

        let err = QuotaError::Upstream {
            status: 500,
            body: "forbidden 403 in body text".to_string(),
        };
        assert!(!err.is_forbidden());

        assert!(!QuotaError::Parse("403 forbidden".to_string()).is_forbidden());
    }

    #[test]
    fn test_error_serializes_as_message() {
        let err = QuotaError::Upstream {
            status: 429,
            body: "slow down".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"API returned status 429: slow down\"");
    }
}
