//! Cache Store Module
//!
//! Entry storage combining a HashMap with the write-ordered eviction queue.
//! The store itself is synchronous; the engine guards it with a lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, EvictionQueue};

// == Cache Store ==
/// Key-value storage with optional capacity bound.
///
/// When bounded, the eviction queue holds exactly the store's key set.
#[derive(Debug)]
pub struct Store<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Write order, present only for bounded stores
    order: Option<EvictionQueue<K>>,
    /// Next write sequence number
    next_seq: u64,
}

impl<K, V> Store<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `initial_capacity` - Sizing hint for the backing map
    /// * `max_entries` - Maximum number of entries, or None for no bound
    ///
    /// The hint never exceeds `max_entries`. A hint the allocator cannot
    /// satisfy is dropped and the map grows on demand.
    pub fn new(initial_capacity: Option<usize>, max_entries: Option<usize>) -> Self {
        let hint = match (initial_capacity, max_entries) {
            (Some(hint), Some(max)) => hint.min(max),
            (Some(hint), None) => hint,
            (None, _) => 0,
        };

        let mut entries = HashMap::new();
        if let Err(err) = entries.try_reserve(hint) {
            debug!(hint, error = %err, "Ignoring unsatisfiable capacity hint");
        }

        Self {
            entries,
            order: max_entries.map(EvictionQueue::new),
            next_seq: 0,
        }
    }

    // == Insert ==
    /// Stores a value with a fresh write time, overwriting any existing entry.
    ///
    /// The key moves to the newest end of the eviction order. If a new key
    /// would push a bounded store over capacity, the oldest written entry is
    /// evicted first and its key is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let previous = self.entries.remove(&key).map(|entry| entry.seq);
        let mut evicted = None;

        if let Some(order) = self.order.as_mut() {
            if previous.is_none() && order.is_full() {
                if let Some(victim) = order.pop_oldest() {
                    self.entries.remove(&victim);
                    debug!(capacity = order.capacity(), "Evicted oldest cache entry");
                    evicted = Some(victim);
                }
            }
            order.record_write(key.clone(), seq, previous);
        }

        self.entries.insert(key, CacheEntry::new(value, seq));
        evicted
    }

    // == Get ==
    /// Returns the entry for `key`, expired or not.
    pub fn get<Q>(&self, key: &Q) -> Option<&CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    /// Returns the entry for `key` only if it has not expired at `now`.
    pub fn get_fresh<Q>(&self, key: &Q, ttl: Option<Duration>, now: Instant) -> Option<&CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(ttl, now))
    }

    // == Remove ==
    /// Removes an entry by key.
    ///
    /// Returns true if an entry was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.remove(key) {
            Some(entry) => {
                if let Some(order) = self.order.as_mut() {
                    order.remove(entry.seq);
                }
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `key` if it has expired at `now`.
    pub fn remove_if_expired<Q>(&mut self, key: &Q, ttl: Option<Duration>, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(ttl, now));
        expired && self.remove(key)
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Some(order) = self.order.as_mut() {
            order.clear();
        }
    }

    // == Purge Expired ==
    /// Removes all entries expired at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, ttl: Option<Duration>, now: Instant) -> usize {
        if ttl.is_none() {
            return 0;
        }

        let expired: Vec<(K, u64)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl, now))
            .map(|(key, entry)| (key.clone(), entry.seq))
            .collect();

        for (key, seq) in &expired {
            self.entries.remove(key);
            if let Some(order) = self.order.as_mut() {
                order.remove(*seq);
            }
        }

        expired.len()
    }

    // == Length ==
    /// Returns the current number of entries, including unreclaimed expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capacity bound, if any.
    pub fn max_entries(&self) -> Option<usize> {
        self.order.as_ref().map(EvictionQueue::capacity)
    }

    #[cfg(test)]
    pub(crate) fn eviction_order(&self) -> Option<Vec<K>> {
        self.order
            .as_ref()
            .map(|order| order.keys().cloned().collect())
    }
}
