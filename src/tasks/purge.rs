//! Expired Entry Purge Task
//!
//! Background task that periodically removes expired cache entries.

use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Inner;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The task sleeps for `interval` between sweeps. It holds only a weak
/// reference to the cache and exits on its own once the cache is gone; the
/// owning cache aborts it on dispose.
///
/// # Returns
/// A JoinHandle for the spawned task, used by the cache to abort it.
pub(crate) fn spawn_purge_task<K, V>(cache: Weak<Inner<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting cache purge task with interval of {:?}", interval);

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, purge task exiting");
                break;
            };
            let removed = cache.purge_expired().await;
            drop(cache);

            if removed > 0 {
                info!("Cache purge: removed {} expired entries", removed);
            } else {
                debug!("Cache purge: no expired entries found");
            }
        }
    })
}
