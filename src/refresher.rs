use crate::fetcher::TransferFetcher;
use crate::models::ClassifiedTransaction;
use crate::optimistic::HistoryCache;
use alloy_primitives::Address;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

/// Periodically refetches one account's history and folds it into the
/// shared cache.
pub struct HistoryRefresher {
    fetcher: Arc<TransferFetcher>,
    cache: HistoryCache,
    account: Address,
    interval: Duration,
}

impl HistoryRefresher {
    pub fn new(
        fetcher: Arc<TransferFetcher>,
        cache: HistoryCache,
        account: Address,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            cache,
            account,
            interval,
        }
    }

    /// One fetch-classify-reconcile round. Returns the history now cached.
    pub async fn refresh_once(&self) -> Vec<ClassifiedTransaction> {
        let started = Instant::now();
        let fresh = self.fetcher.get_history(&self.account).await;
        let fetched = fresh.len();
        let merged = self.cache.reconcile(&self.account, fresh);

        debug!(
            "Refreshed history for {} in {:?}: {} fetched, {} cached",
            self.account,
            started.elapsed(),
            fetched,
            merged.len()
        );
        merged
    }

    /// Refreshes forever, publishing every history that differs from the
    /// previous one.
    pub async fn run(&self, updates: watch::Sender<Vec<ClassifiedTransaction>>) {
        info!(
            "Refreshing history for {} every {}s",
            self.account,
            self.interval.as_secs()
        );

        loop {
            let loop_start = Instant::now();

            let merged = self.refresh_once().await;
            updates.send_if_modified(|current| {
                if *current == merged {
                    return false;
                }
                info!(
                    "History for {} changed: {} entries ({} pending)",
                    self.account,
                    merged.len(),
                    merged.iter().filter(|tx| tx.is_optimistic).count()
                );
                *current = merged;
                true
            });

            let elapsed = loop_start.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
    }
}
