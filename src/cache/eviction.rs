//! Eviction Queue Module
//!
//! Orders keys by their last write for bounded caches.

use std::collections::BTreeMap;

// == Eviction Queue ==
/// Tracks write order for oldest-first eviction.
///
/// Keys are indexed by the write sequence number of their entry, so the
/// smallest sequence number is always the oldest write. Reads never reorder
/// the queue; only writes do.
#[derive(Debug)]
pub struct EvictionQueue<K> {
    /// Keys by write sequence number
    order: BTreeMap<u64, K>,
    /// Maximum number of keys allowed
    capacity: usize,
}

impl<K> EvictionQueue<K> {
    // == Constructor ==
    /// Creates a new empty queue bounded at `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            order: BTreeMap::new(),
            capacity,
        }
    }

    /// Maximum number of keys the owning store may hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when admitting one more key would exceed the capacity.
    pub fn is_full(&self) -> bool {
        self.order.len() >= self.capacity
    }

    // == Record Write ==
    /// Places `key` at the most recently written end.
    ///
    /// `previous` is the sequence number of the key's prior write, if any.
    pub fn record_write(&mut self, key: K, seq: u64, previous: Option<u64>) {
        if let Some(previous) = previous {
            self.order.remove(&previous);
        }
        self.order.insert(seq, key);
    }

    // == Remove ==
    /// Drops the key written with `seq`.
    pub fn remove(&mut self, seq: u64) -> Option<K> {
        self.order.remove(&seq)
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest written key.
    ///
    /// Returns None if the queue is empty.
    pub fn pop_oldest(&mut self) -> Option<K> {
        self.order.pop_first().map(|(_, key)| key)
    }

    /// Returns the oldest written key without removing it.
    #[cfg(test)]
    pub(crate) fn peek_oldest(&self) -> Option<&K> {
        self.order.values().next()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys from oldest to newest write.
    #[cfg(test)]
    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }
}
