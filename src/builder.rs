//! Cache Builders
//!
//! Assemble construction options for key-value and single-value caches.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use crate::cache::{loader, Cache, Loader};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::single::SingleValueCache;

// == Cache Builder ==
/// Builder for a key-value [`Cache`].
///
/// Options can be set one by one or taken wholesale from a [`CacheConfig`].
/// Nothing is checked until [`CacheBuilder::build`], which rejects invalid
/// options before any cache exists.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use loading_cache::Cache;
///
/// # #[tokio::main]
/// # async fn main() -> loading_cache::Result<()> {
/// let cache: Cache<String, usize> = Cache::builder()
///     .with_loader(|key: String| async move { Ok::<_, anyhow::Error>(key.len()) })
///     .with_expiration(Duration::from_secs(60))
///     .with_maximum_entries(1_000)
///     .build()?;
///
/// assert_eq!(cache.get("hello").await?, 5);
/// # Ok(())
/// # }
/// ```
pub struct CacheBuilder<K, V> {
    config: CacheConfig,
    loader: Option<Loader<K, V>>,
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self {
            config: CacheConfig::default(),
            loader: None,
        }
    }
}

impl<K, V> fmt::Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("config", &self.config)
            .field("loading", &self.loader.is_some())
            .finish()
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every numeric and duration option with those in `config`.
    ///
    /// The loader, if any, is kept.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Makes this a read-through cache.
    ///
    /// On a miss, `loader` is called with the key and its result is stored and
    /// returned. Concurrent misses for one key share a single call.
    pub fn with_loader<F, Fut>(mut self, loader: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.loader = Some(loader::from_async(loader));
        self
    }

    /// Like [`CacheBuilder::with_loader`], for a synchronous loader.
    ///
    /// The loader runs on the Tokio blocking pool.
    pub fn with_blocking_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(K) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.loader = Some(loader::from_blocking(loader));
        self
    }

    /// Sets the time-to-live of every entry, counted from its last write.
    pub fn with_expiration(mut self, ttl: Duration) -> Self {
        self.config.expiration = Some(ttl);
        self
    }

    /// Sweeps expired entries every `interval` on a background task.
    ///
    /// Ignored unless an expiration is also set. Without it, expired entries
    /// are removed only when accessed.
    pub fn with_background_purge(mut self, interval: Duration) -> Self {
        self.config.purge_interval = Some(interval);
        self
    }

    /// Presizes the backing map. Does not limit the number of entries.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = Some(capacity);
        self
    }

    /// Bounds the cache; beyond `max_entries` the oldest write is evicted.
    ///
    /// Must be > 0.
    pub fn with_maximum_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = Some(max_entries);
        self
    }

    // == Build ==
    /// Constructs the cache.
    ///
    /// # Errors
    /// - `CacheError::InvalidConfig` if an option is out of range
    /// - `CacheError::Runtime` if a background purge is configured outside a
    ///   Tokio runtime
    pub fn build(self) -> Result<Cache<K, V>> {
        Cache::new(self.config, self.loader)
    }
}

// == Single Value Cache Builder ==
/// Builder for a [`SingleValueCache`].
pub struct SingleValueCacheBuilder<V> {
    inner: CacheBuilder<(), V>,
}

impl<V> Default for SingleValueCacheBuilder<V> {
    fn default() -> Self {
        Self {
            inner: CacheBuilder::default(),
        }
    }
}

impl<V> fmt::Debug for SingleValueCacheBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleValueCacheBuilder")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<V> SingleValueCacheBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the value on a miss.
    pub fn with_loader<F, Fut>(mut self, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.inner = self.inner.with_loader(move |()| loader());
        self
    }

    /// Computes the value on a miss with a synchronous function.
    pub fn with_blocking_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.inner = self.inner.with_blocking_loader(move |()| loader());
        self
    }

    /// Sets the time-to-live of the value, counted from its last write.
    pub fn with_expiration(mut self, ttl: Duration) -> Self {
        self.inner = self.inner.with_expiration(ttl);
        self
    }

    /// Sweeps an expired value every `interval`. Ignored without expiration.
    pub fn with_background_purge(mut self, interval: Duration) -> Self {
        self.inner = self.inner.with_background_purge(interval);
        self
    }

    pub fn build(self) -> Result<SingleValueCache<V>> {
        let cache = self
            .inner
            .with_initial_capacity(1)
            .with_maximum_entries(1)
            .build()?;
        Ok(SingleValueCache::new(cache))
    }
}
