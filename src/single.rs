//! Single Value Cache
//!
//! A cache holding at most one value with no key, built on [`Cache`] with the
//! unit type as its only key.

use crate::builder::SingleValueCacheBuilder;
use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::error::Result;

/// A cache that holds a single value.
///
/// Loading, expiration and purging behave exactly as in [`Cache`].
#[derive(Debug)]
pub struct SingleValueCache<V> {
    cache: Cache<(), V>,
}

impl<V> SingleValueCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Starts constructing a single-value cache.
    pub fn builder() -> SingleValueCacheBuilder<V> {
        SingleValueCacheBuilder::new()
    }

    pub(crate) fn new(cache: Cache<(), V>) -> Self {
        Self { cache }
    }

    /// True if a value is cached and unexpired. Never loads.
    pub async fn has_value(&self) -> bool {
        self.cache.contains_key(&()).await
    }

    /// Returns the value, loading it if needed; `Ok(None)` if there is none.
    pub async fn try_get(&self) -> Result<Option<V>> {
        self.cache.try_get(&()).await
    }

    pub async fn set(&self, value: V) {
        self.cache.set((), value).await;
    }

    /// Removes the cached value, if any.
    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    pub fn config(&self) -> &CacheConfig {
        self.cache.config()
    }

    /// Stops the background purge task. Idempotent.
    pub fn dispose(&self) {
        self.cache.dispose();
    }
}

impl<V> SingleValueCache<V>
where
    V: Clone + Default + Send + Sync + 'static,
{
    /// Returns the value, loading it if needed; `V::default()` if there is none.
    pub async fn get(&self) -> Result<V> {
        self.cache.get(&()).await
    }
}
