//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with write-time tracking.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and write metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Time of the last write (insertion, explicit set, or reload)
    pub written_at: Instant,
    /// Global write sequence number, used as the eviction order
    pub seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry written now.
    pub fn new(value: V, seq: u64) -> Self {
        Self {
            value,
            written_at: Instant::now(),
            seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once its age is greater than or
    /// equal to the TTL. Without a TTL an entry never expires.
    pub fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match ttl {
            Some(ttl) => self.age(now) >= ttl,
            None => false,
        }
    }

    /// Time elapsed since the last write.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.written_at)
    }
}
