//! Cache Engine Module
//!
//! The shared cache handle: read-through loading with per-key single-flight,
//! TTL expiration and write-ordered eviction.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::builder::CacheBuilder;
use crate::cache::flight::{Flight, LoadTable};
use crate::cache::{Loader, Store};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_purge_task;

/// Everything guarded by the cache lock.
///
/// Store, eviction queue and load table change together under one guard, and
/// the guard is never held while a loader runs.
#[derive(Debug)]
pub(crate) struct State<K, V> {
    store: Store<K, V>,
    loads: LoadTable<K, V>,
}

pub(crate) struct Inner<K, V> {
    state: RwLock<State<K, V>>,
    loader: Option<Loader<K, V>>,
    config: CacheConfig,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Purge Expired ==
    /// Removes all currently expired entries, returning how many were removed.
    pub(crate) async fn purge_expired(&self) -> usize {
        let mut state = self.state.write().await;
        state
            .store
            .purge_expired(self.config.expiration, Instant::now())
    }
}

// == Cache ==
/// A concurrent key-value cache.
///
/// Built with [`Cache::builder`]. Keys are looked up by their borrowed form,
/// so a `Cache<String, V>` accepts `&str`.
///
/// # Behavior
/// - With a loader, a miss computes the value once per key no matter how many
///   callers are waiting for it; every waiter gets the same outcome.
/// - With an expiration, an entry is treated as absent once the time since its
///   last write reaches the TTL, whether or not a purge task is running.
/// - With a maximum size, a write of a new key into a full cache evicts the
///   entry written longest ago. Reads never change the eviction order.
///
/// Loads run on spawned Tokio tasks, so a loading cache must be used from
/// within a Tokio runtime.
///
/// Dropping the cache (or calling [`Cache::dispose`]) stops the background
/// purge. A disposed cache keeps serving every operation; expired entries are
/// then only removed when they are touched.
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
    purge_task: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts constructing a cache.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    // == Constructor ==
    /// Creates a cache from a validated configuration.
    ///
    /// Starts the background purge task if the configuration asks for one.
    pub(crate) fn new(config: CacheConfig, loader: Option<Loader<K, V>>) -> Result<Self> {
        config.validate()?;

        let purge_interval = config.effective_purge_interval();
        if config.purge_interval.is_some() && purge_interval.is_none() {
            debug!("Ignoring purge interval: entries never expire");
        }

        let inner = Arc::new(Inner {
            state: RwLock::new(State {
                store: Store::new(config.initial_capacity, config.max_entries),
                loads: LoadTable::new(),
            }),
            loader,
            config,
        });

        let purge_task = match purge_interval {
            Some(interval) => {
                Handle::try_current().map_err(|err| {
                    CacheError::Runtime(format!("background purge needs a Tokio runtime: {err}"))
                })?;
                Some(spawn_purge_task(Arc::downgrade(&inner), interval))
            }
            None => None,
        };

        Ok(Self {
            inner,
            purge_task: Mutex::new(purge_task),
        })
    }

    // == Try Get ==
    /// Looks up `key`, loading it if missing and a loader is configured.
    ///
    /// Returns `Ok(None)` when there is no value and nothing to load it with.
    /// A load failure is returned to every caller waiting on that load, and
    /// nothing is stored; the next lookup tries again.
    pub async fn try_get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let ttl = self.inner.config.expiration;

        {
            let state = self.inner.state.read().await;
            if let Some(entry) = state.store.get_fresh(key, ttl, Instant::now()) {
                return Ok(Some(entry.value.clone()));
            }
        }

        let flight = {
            let mut state = self.inner.state.write().await;
            let now = Instant::now();

            // Re-check: another writer may have filled the key meanwhile
            if let Some(entry) = state.store.get_fresh(key, ttl, now) {
                return Ok(Some(entry.value.clone()));
            }
            state.store.remove_if_expired(key, ttl, now);

            let Some(loader) = self.inner.loader.as_ref() else {
                return Ok(None);
            };

            match state.loads.join(key) {
                Some(flight) => flight,
                None => self.start_load(&mut state, loader, key.to_owned()),
            }
        };

        flight.await.map(Some)
    }

    /// Spawns the load for `key` and publishes it in the load table.
    ///
    /// Must be called with the state lock held, so exactly one caller starts
    /// the load and every later caller joins it.
    fn start_load(&self, state: &mut State<K, V>, loader: &Loader<K, V>, key: K) -> Flight<V> {
        let id = state.loads.next_id();
        let task = tokio::spawn(run_load(
            Arc::clone(&self.inner),
            Arc::clone(loader),
            key.clone(),
            id,
        ));

        let flight = async move {
            task.await
                .unwrap_or_else(|err| Err(CacheError::LoadAborted(err.to_string())))
        }
        .boxed()
        .shared();

        state.loads.register(key, id, flight.clone());
        debug!(load_id = id, "Started load");
        flight
    }

    // == Set ==
    /// Stores a value, overwriting any existing entry.
    ///
    /// The write gets a fresh timestamp and moves the key to the newest end of
    /// the eviction order. A load already in flight for the key is not
    /// cancelled and may overwrite this value when it finishes.
    pub async fn set(&self, key: K, value: V) {
        let mut state = self.inner.state.write().await;
        state.store.insert(key, value);
    }

    // == Contains Key ==
    /// Returns true if `key` maps to an unexpired entry. Never loads.
    pub async fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let state = self.inner.state.read().await;
        state
            .store
            .get_fresh(key, self.inner.config.expiration, Instant::now())
            .is_some()
    }

    // == Remove ==
    /// Removes the entry for `key`, if any.
    pub async fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.inner.state.write().await;
        state.store.remove(key);
    }

    // == Clear ==
    /// Removes every entry and forgets all in-flight loads.
    ///
    /// Loads already running still answer their waiters but do not store
    /// their results.
    pub async fn clear(&self) {
        let mut state = self.inner.state.write().await;
        state.store.clear();
        state.loads.clear();
    }

    /// Removes all currently expired entries now.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        self.inner.purge_expired().await
    }

    /// Number of stored entries, including expired ones not yet reclaimed.
    pub async fn len(&self) -> usize {
        self.inner.state.read().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.store.is_empty()
    }

    /// Number of loads currently in flight.
    pub async fn pending_loads(&self) -> usize {
        self.inner.state.read().await.loads.len()
    }

    /// True if this is a read-through cache.
    pub fn is_loading(&self) -> bool {
        self.inner.loader.is_some()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    // == Get ==
    /// Like [`Cache::try_get`], but yields `V::default()` when there is no value.
    ///
    /// Use `try_get` to tell a missing value from a stored default.
    pub async fn get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        Ok(self.try_get(key).await?.unwrap_or_default())
    }
}

impl<K, V> Cache<K, V> {
    // == Dispose ==
    /// Stops the background purge task. Idempotent.
    pub fn dispose(&self) {
        let task = self
            .purge_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            info!("Background purge task stopped");
        }
    }

    /// True while a background purge task is attached.
    pub fn has_purge_task(&self) -> bool {
        self.purge_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.inner.config)
            .field("loading", &self.inner.loader.is_some())
            .finish_non_exhaustive()
    }
}

/// Runs one load to completion and records its outcome.
///
/// Runs on its own task so the load finishes even if every waiter goes away.
/// The value is stored only if the load still owns its slot in the table.
async fn run_load<K, V>(inner: Arc<Inner<K, V>>, loader: Loader<K, V>, key: K, id: u64) -> Result<V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    let outcome = match AssertUnwindSafe(async { loader(key.clone()).await })
        .catch_unwind()
        .await
    {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CacheError::from(err)),
        Err(panic) => Err(CacheError::from_panic(panic)),
    };

    let mut state = inner.state.write().await;
    if state.loads.complete(&key, id) {
        match &outcome {
            Ok(value) => {
                state.store.insert(key, value.clone());
                debug!(load_id = id, "Load completed");
            }
            Err(err) => warn!(load_id = id, error = %err, "Load failed"),
        }
    } else {
        debug!(load_id = id, "Load outlived its slot; result not stored");
    }

    outcome
}
