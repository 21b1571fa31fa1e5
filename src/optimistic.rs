use crate::classifier::{HISTORY_LIMIT, sort_and_cap};
use crate::models::ClassifiedTransaction;
use alloy_primitives::Address;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Puts a freshly submitted transaction in front of the cached history.
pub fn record_optimistic(
    cached: &[ClassifiedTransaction],
    record: ClassifiedTransaction,
) -> Vec<ClassifiedTransaction> {
    let mut merged = Vec::with_capacity(cached.len() + 1);
    merged.push(record.into_optimistic());
    merged.extend(cached.iter().cloned());
    merged.truncate(HISTORY_LIMIT);
    merged
}

/// Merges a freshly fetched history into the cached one.
///
/// Optimistic entries whose hash already shows up in `fresh` are dropped,
/// the rest are kept in front of `fresh` and the whole list is re-sorted.
/// The outcome depends only on the two inputs, so results of overlapping
/// fetches can be applied in any order.
pub fn reconcile(
    cached: &[ClassifiedTransaction],
    fresh: Vec<ClassifiedTransaction>,
) -> Vec<ClassifiedTransaction> {
    let confirmed: HashSet<String> = fresh
        .iter()
        .filter(|tx| !tx.hash.is_empty())
        .map(|tx| tx.hash.to_ascii_lowercase())
        .collect();

    let pending: Vec<ClassifiedTransaction> = cached
        .iter()
        .filter(|tx| tx.is_optimistic)
        .filter(|tx| !tx.hash.is_empty() && !confirmed.contains(&tx.hash.to_ascii_lowercase()))
        .cloned()
        .collect();

    if pending.is_empty() {
        return fresh;
    }

    let mut merged = pending;
    merged.extend(fresh);
    sort_and_cap(&mut merged);
    merged
}

/// Recent history per account, shared between the refresh loop and the
/// submission path.
#[derive(Clone, Default)]
pub struct HistoryCache {
    entries: Arc<RwLock<HashMap<Address, Vec<ClassifiedTransaction>>>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &Address) -> Vec<ClassifiedTransaction> {
        self.entries
            .read()
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record_optimistic(
        &self,
        account: &Address,
        record: ClassifiedTransaction,
    ) -> Vec<ClassifiedTransaction> {
        let mut entries = self.entries.write();
        let slot = entries.entry(*account).or_default();
        *slot = record_optimistic(slot, record);
        debug!("Recorded optimistic transaction for {}", account);
        slot.clone()
    }

    /// Read, merge and write happen under one lock so a concurrent
    /// optimistic insert is never lost.
    pub fn reconcile(
        &self,
        account: &Address,
        fresh: Vec<ClassifiedTransaction>,
    ) -> Vec<ClassifiedTransaction> {
        let mut entries = self.entries.write();
        let slot = entries.entry(*account).or_default();
        *slot = reconcile(slot, fresh);
        slot.clone()
    }

    pub fn clear(&self, account: &Address) {
        self.entries.write().remove(account);
    }

    pub fn clear_all(&self) {
        self.entries.write().clear();
    }
}
