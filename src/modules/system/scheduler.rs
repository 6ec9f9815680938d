use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::proxy::quota::QuotaCache;

/// Periodically drops expired quota entries until `cancel` fires.
pub fn start_quota_sweeper(
    cache: Arc<QuotaCache>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Quota sweeper received cancel signal");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = cache.sweep();
                    if removed > 0 {
                        tracing::debug!(
                            "Quota sweeper: removed {} expired entr{}",
                            removed,
                            if removed == 1 { "y" } else { "ies" }
                        );
                    }
                }
            }
        }
    });

    tracing::info!("Quota cache sweeper started (interval: {:?})", interval);
    handle
}
