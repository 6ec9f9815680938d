use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_SUBSCRIPTION_TIER: &str = "FREE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelQuota {
    /// Nominally in `[0, 1]`; taken from the upstream as-is.
    pub remaining_fraction: f64,
    /// `None` when the upstream omitted the reset time or sent an unparseable one.
    pub reset_time: Option<DateTime<Utc>>,
}

/// Point-in-time quota for one account. Immutable once built; shared behind an
/// `Arc` by the cache.
///
/// When `is_forbidden` is set the account may not read its quota and `models`,
/// `subscription_tier` and `project_id` carry no information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub models: HashMap<String, ModelQuota>,
    pub subscription_tier: String,
    pub project_id: String,
    pub fetched_at: DateTime<Utc>,
    pub is_forbidden: bool,
}

impl QuotaSnapshot {
    pub fn new(
        project_id: String,
        subscription_tier: String,
        models: HashMap<String, ModelQuota>,
    ) -> Self {
        Self {
            models,
            subscription_tier,
            project_id,
            fetched_at: Utc::now(),
            is_forbidden: false,
        }
    }

    pub fn forbidden() -> Self {
        Self {
            models: HashMap::new(),
            subscription_tier: String::new(),
            project_id: String::new(),
            fetched_at: Utc::now(),
            is_forbidden: true,
        }
    }

    pub fn model(&self, name: &str) -> Option<&ModelQuota> {
        if self.is_forbidden {
            return None;
        }
        self.models.get(name)
    }

    /// Model with the smallest remaining fraction, if any quota is visible.
    pub fn lowest_remaining(&self) -> Option<(&str, &ModelQuota)> {
        if self.is_forbidden {
            return None;
        }
        self.models
            .iter()
            .min_by(|a, b| a.1.remaining_fraction.total_cmp(&b.1.remaining_fraction))
            .map(|(name, quota)| (name.as_str(), quota))
    }
}
