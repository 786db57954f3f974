//! Sharded map with an optional capacity bound.
//!
//! Registry and ledger entries are never removed by the decision logic, so a
//! long-running deployment caps them here instead: every entry carries a
//! last-touch stamp and the least recently touched entries are evicted when an
//! insert would pass the cap. With no capacity configured this is a plain
//! sharded map.
//!
//! The bound is approximate under concurrency - eviction never holds a key
//! guard while it scans, so simultaneous inserts can briefly overshoot the
//! cap. Evicting an entry forgets its state (a managed signer is released
//! early, an origin loses its associations); capacity must be sized for the
//! deployment's origin and signer cardinality.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tracing::debug;

struct Slot<V> {
    value: V,
    touched_ms: i64,
}

/// Sharded key-value store with least-recently-touched eviction past an
/// optional capacity.
pub struct BoundedMap<K, V> {
    inner: DashMap<K, Slot<V>>,
    capacity: Option<NonZeroUsize>,
}

impl<K, V> BoundedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            inner: DashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Mutate the entry for `key` under its shard guard, creating it with
    /// `init` if absent. `update` receives the value and whether it was just
    /// inserted. Touches the entry.
    pub fn upsert<R>(
        &self,
        key: K,
        now_ms: i64,
        init: impl FnOnce() -> V,
        update: impl FnOnce(&mut V, bool) -> R,
    ) -> R {
        if self.capacity.is_some() && !self.inner.contains_key(&key) {
            self.make_room();
        }

        match self.inner.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.touched_ms = now_ms;
                update(&mut slot.value, false)
            }
            Entry::Vacant(vacant) => {
                let mut slot = vacant.insert(Slot {
                    value: init(),
                    touched_ms: now_ms,
                });
                update(&mut slot.value, true)
            }
        }
    }

    /// Read the entry for `key`, refreshing its last-touch stamp.
    pub fn read<R>(&self, key: &K, now_ms: i64, f: impl FnOnce(&V) -> R) -> Option<R> {
        let mut slot = self.inner.get_mut(key)?;
        slot.touched_ms = now_ms;
        Some(f(&slot.value))
    }

    /// Read the entry for `key` without touching it. For introspection only.
    pub fn peek<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.inner.get(key).map(|slot| f(&slot.value))
    }

    /// Evict least recently touched entries until an insert fits the cap.
    fn make_room(&self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        let capacity = capacity.get();
        if self.inner.len() < capacity {
            return;
        }

        let mut stamps: Vec<(K, i64)> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().touched_ms))
            .collect();
        stamps.sort_by_key(|(_, touched_ms)| *touched_ms);

        let excess = stamps.len().saturating_sub(capacity - 1);
        let mut evicted = 0usize;
        for (key, _) in stamps.into_iter().take(excess) {
            if self.inner.remove(&key).is_some() {
                evicted += 1;
            }
        }
        debug!(evicted, capacity, "Evicted least recently touched entries");
    }
}
