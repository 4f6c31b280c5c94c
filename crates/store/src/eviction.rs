//! Caller-driven quota recovery for collection namespaces.

use crate::error::Result;
use crate::namespace::Namespace;
use crate::store::{DurableStore, Mirror};
use foodlog_core::models::Timestamped;

/// Number of entries to drop from a collection of `len`.
///
/// `ceil(len * fraction)`, at least one, and never the whole collection
/// when it has more than one entry.
pub fn eviction_count(len: usize, fraction: f64) -> usize {
    if len <= 1 {
        return 0;
    }
    let wanted = (len as f64 * fraction).ceil() as usize;
    wanted.clamp(1, len - 1)
}

/// Remove the `count` oldest entries, keeping the rest in their order.
pub fn trim_oldest<T: Timestamped>(items: &mut Vec<T>, count: usize) -> usize {
    if count == 0 || items.is_empty() {
        return 0;
    }
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        items[a]
            .timestamp()
            .cmp(&items[b].timestamp())
            .then_with(|| items[a].id().cmp(items[b].id()))
    });
    let mut drop = vec![false; items.len()];
    for &index in order.iter().take(count) {
        drop[index] = true;
    }
    let mut index = 0;
    items.retain(|_| {
        let keep = !drop[index];
        index += 1;
        keep
    });
    count.min(order.len())
}

impl DurableStore {
    /// Write a collection, recovering once from a quota failure.
    ///
    /// On `QuotaExceeded` the oldest `ceil(n * eviction_fraction)` entries are
    /// dropped and the write retried exactly once. Returns how many entries
    /// were evicted (0 if the first write succeeded). A second failure is
    /// returned unchanged and nothing is written.
    pub fn write_with_eviction<N, T>(&self, items: Vec<T>) -> Result<usize>
    where
        N: Namespace<Value = Vec<T>>,
        T: Timestamped,
    {
        let mut mirror = self.mirror_mut();
        self.persist_evicting::<N, T>(&mut mirror, items)
    }

    /// Append one entry, evicting old entries once if the store is full.
    ///
    /// The collection is read and written under one lock; if it cannot be
    /// read, nothing is written.
    pub fn append_with_eviction<N, T>(&self, entry: T) -> Result<usize>
    where
        N: Namespace<Value = Vec<T>>,
        T: Timestamped,
    {
        let mut mirror = self.mirror_mut();
        let mut items = self.load::<N>(&mut mirror)?;
        items.push(entry);
        self.persist_evicting::<N, T>(&mut mirror, items)
    }

    fn persist_evicting<N, T>(&self, mirror: &mut Mirror, mut items: Vec<T>) -> Result<usize>
    where
        N: Namespace<Value = Vec<T>>,
        T: Timestamped,
    {
        let err = match self.persist::<N>(mirror, &items) {
            Ok(()) => return Ok(0),
            Err(e) if e.is_quota_exceeded() => e,
            Err(e) => return Err(e),
        };

        let count = eviction_count(items.len(), self.eviction_fraction());
        if count == 0 {
            return Err(err);
        }
        let evicted = trim_oldest(&mut items, count);
        tracing::warn!(
            namespace = N::KEY,
            evicted,
            remaining = items.len(),
            "Quota exceeded, evicting oldest entries"
        );

        self.persist::<N>(mirror, &items)?;
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::namespace::{FoodLog, WaterLog};
    use chrono::{Duration, TimeZone, Utc};
    use foodlog_core::models::{EntryId, WaterEntry};
    use std::sync::Arc;

    fn water(n: usize) -> Vec<WaterEntry> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        (0..n)
            .map(|i| WaterEntry {
                id: EntryId::from(format!("w{i:03}").as_str()),
                timestamp: base + Duration::minutes(i as i64),
                amount_ml: 250,
            })
            .collect()
    }

    fn raw_len(items: &[WaterEntry]) -> u64 {
        (WaterLog::KEY.len() + serde_json::to_string(items).unwrap().len()) as u64
    }

    #[test]
    fn test_eviction_count() {
        assert_eq!(eviction_count(0, 0.2), 0);
        assert_eq!(eviction_count(1, 0.2), 0);
        assert_eq!(eviction_count(2, 0.2), 1);
        assert_eq!(eviction_count(10, 0.2), 2);
        assert_eq!(eviction_count(11, 0.2), 3);
        assert_eq!(eviction_count(10, 1.0), 9);
    }

    #[test]
    fn test_trim_oldest_keeps_order() {
        let mut items = water(5);
        items.swap(0, 4);
        let removed = trim_oldest(&mut items, 2);
        assert_eq!(removed, 2);
        let ids: Vec<&str> = items.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["w004", "w002", "w003"]);
    }

    #[test]
    fn test_no_eviction_when_it_fits() {
        let store = DurableStore::in_memory();
        assert_eq!(store.write_with_eviction::<WaterLog, _>(water(10)).unwrap(), 0);
        assert_eq!(store.read::<WaterLog>().len(), 10);
    }

    #[test]
    fn test_evicts_oldest_and_retries_once() {
        let all = water(10);
        let quota = raw_len(&all[2..]);
        let store = DurableStore::new(Arc::new(MemoryBackend::with_quota(quota)));

        let evicted = store.write_with_eviction::<WaterLog, _>(all.clone()).unwrap();
        assert_eq!(evicted, 2);
        assert_eq!(store.read::<WaterLog>(), all[2..].to_vec());
    }

    #[test]
    fn test_second_failure_is_surfaced() {
        let all = water(10);
        let quota = raw_len(&all[5..]);
        let store = DurableStore::new(Arc::new(MemoryBackend::with_quota(quota)));

        let err = store.write_with_eviction::<WaterLog, _>(all).unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(store.read::<WaterLog>().is_empty());
    }

    #[test]
    fn test_append_with_eviction_keeps_new_entry() {
        let existing = water(9);
        let quota = raw_len(&water(9));
        let store = DurableStore::new(Arc::new(MemoryBackend::with_quota(quota)));
        store.write::<WaterLog>(&existing).unwrap();

        let newest = WaterEntry {
            id: EntryId::from("w999"),
            timestamp: existing[8].timestamp + Duration::minutes(1),
            amount_ml: 500,
        };
        let evicted = store.append_with_eviction::<WaterLog, _>(newest.clone()).unwrap();
        assert_eq!(evicted, 2);

        let log = store.read::<WaterLog>();
        assert_eq!(log.len(), 8);
        assert_eq!(log.last(), Some(&newest));
        assert!(store.read::<FoodLog>().is_empty());
    }
}
