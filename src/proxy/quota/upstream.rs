// Cloud Code quota endpoints: loadCodeAssist resolves project and tier,
// fetchAvailableModels lists per-model quota.

use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::error::{QuotaError, QuotaResult};
use crate::models::{ModelQuota, DEFAULT_SUBSCRIPTION_TIER};

pub const LOAD_CODE_ASSIST_PATH: &str = "/v1internal:loadCodeAssist";
pub const FETCH_AVAILABLE_MODELS_PATH: &str = "/v1internal:fetchAvailableModels";

/// Account identity as reported by loadCodeAssist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub project_id: String,
    pub subscription_tier: String,
}

#[derive(Clone)]
pub struct QuotaUpstreamClient {
    client: Client,
    user_agent: String,
}

impl QuotaUpstreamClient {
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn build_url(base_url: &str, path: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    /// POSTs `{}` and returns the raw body of a 2xx response. Tries exactly one URL.
    async fn post_empty(
        &self,
        cancel: &CancellationToken,
        url: &str,
        access_token: &str,
    ) -> QuotaResult<String> {
        let request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header(header::ACCEPT, "application/json")
            .body("{}");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<(StatusCode, String), reqwest::Error>((status, body))
        };

        let (status, body) = tokio::select! {
            _ = cancel.cancelled() => return Err(QuotaError::Cancelled),
            result = exchange => result?,
        };

        if !status.is_success() {
            return Err(QuotaError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    pub async fn resolve_identity(
        &self,
        cancel: &CancellationToken,
        access_token: &str,
        base_url: &str,
    ) -> QuotaResult<AccountIdentity> {
        let url = Self::build_url(base_url, LOAD_CODE_ASSIST_PATH);
        let body = self.post_empty(cancel, &url, access_token).await?;
        parse_identity(&body)
    }

    pub async fn resolve_model_quotas(
        &self,
        cancel: &CancellationToken,
        access_token: &str,
        project_id: &str,
        base_url: &str,
    ) -> QuotaResult<HashMap<String, ModelQuota>> {
        let url = Self::build_url(base_url, FETCH_AVAILABLE_MODELS_PATH);
        tracing::debug!("fetching model quotas for project {} from {}", project_id, url);
        let body = self.post_empty(cancel, &url, access_token).await?;
        parse_model_quotas(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadCodeAssistResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    project_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    subscription_tier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvailableModelsResponse {
    /// Outer `None`: field absent. Inner `None`: explicit `null`.
    #[serde(default, deserialize_with = "present")]
    models: Option<Option<HashMap<String, ModelInfo>>>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(rename = "quotaInfo", default)]
    quota_info: Option<QuotaInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotaInfo {
    #[serde(default, deserialize_with = "lenient_fraction")]
    remaining_fraction: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    reset_time: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Strings pass through, any other JSON type reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Accepts numbers and numeric strings.
fn lenient_fraction<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn parse_body<T: DeserializeOwned>(body: &str) -> QuotaResult<T> {
    serde_json::from_str(body).map_err(|e| QuotaError::Parse(format!("invalid response body: {}", e)))
}

pub(crate) fn parse_identity(body: &str) -> QuotaResult<AccountIdentity> {
    let data: LoadCodeAssistResponse = parse_body(body)?;

    let project_id = data.project_id.filter(|id| !id.is_empty()).ok_or_else(|| {
        QuotaError::Parse("projectId not found in response".to_string())
    })?;
    let subscription_tier = data
        .subscription_tier
        .filter(|tier| !tier.is_empty())
        .unwrap_or_else(|| DEFAULT_SUBSCRIPTION_TIER.to_string());

    Ok(AccountIdentity {
        project_id,
        subscription_tier,
    })
}

pub(crate) fn parse_model_quotas(body: &str) -> QuotaResult<HashMap<String, ModelQuota>> {
    let data: AvailableModelsResponse = parse_body(body)?;

    let models = match data.models {
        None => {
            return Err(QuotaError::Parse(
                "models field not found in response".to_string(),
            ))
        }
        Some(models) => models.unwrap_or_default(),
    };

    let mut quotas = HashMap::with_capacity(models.len());
    for (name, info) in models {
        // Partial visibility is normal upstream behavior.
        let Some(quota_info) = info.quota_info else {
            continue;
        };

        let reset_time = quota_info
            .reset_time
            .as_deref()
            .and_then(|raw| parse_reset_time(&name, raw));
        quotas.insert(
            name,
            ModelQuota {
                remaining_fraction: quota_info.remaining_fraction.unwrap_or(0.0),
                reset_time,
            },
        );
    }
    Ok(quotas)
}

fn parse_reset_time(model: &str, raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(
                "quota: ignoring unparseable resetTime {:?} for model {}: {}",
                raw,
                model,
                e
            );
            None
        }
    }
}

/// Whether a failed call is worth repeating against the next base URL.
pub(crate) fn should_try_next_base_url(err: &QuotaError) -> bool {
    match err {
        QuotaError::Network(_) => true,
        QuotaError::Upstream { status, .. } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            status == StatusCode::TOO_MANY_REQUESTS
                || status == StatusCode::REQUEST_TIMEOUT
                || status == StatusCode::NOT_FOUND
                || status.is_server_error()
        }
        _ => false,
    }
}
