use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::QuotaSnapshot;

#[derive(Clone, Debug)]
struct CacheEntry {
    snapshot: Arc<QuotaSnapshot>,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_valid_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// Account id -> last resolved snapshot, valid for a fixed TTL.
///
/// Reads never remove expired entries; that is left to [`QuotaCache::sweep`] so
/// the read path only ever takes the shared lock.
pub struct QuotaCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl QuotaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, account_id: &str) -> Option<Arc<QuotaSnapshot>> {
        self.get_at(account_id, Instant::now())
    }

    pub(crate) fn get_at(&self, account_id: &str, now: Instant) -> Option<Arc<QuotaSnapshot>> {
        let entries = self.entries.read();
        entries
            .get(account_id)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| entry.snapshot.clone())
    }

    pub fn put(&self, account_id: &str, snapshot: Arc<QuotaSnapshot>) {
        self.put_at(account_id, snapshot, Instant::now());
    }

    pub(crate) fn put_at(&self, account_id: &str, snapshot: Arc<QuotaSnapshot>, now: Instant) {
        let entry = CacheEntry {
            snapshot,
            expires_at: now.checked_add(self.ttl),
        };
        self.entries.write().insert(account_id.to_string(), entry);
    }

    pub fn invalidate(&self, account_id: &str) {
        if self.entries.write().remove(account_id).is_some() {
            tracing::debug!("quota cache: cleared entry for account {}", account_id);
        }
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write();
        *entries = HashMap::new();
        tracing::debug!("quota cache: cleared all entries");
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_at(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, account_id: &str) -> bool {
        self.entries.read().contains_key(account_id)
    }
}

impl Default for QuotaCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::models::config::DEFAULT_CACHE_TTL_SECS))
    }
}
