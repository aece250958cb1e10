//! Loader Module
//!
//! Type-erased value computation functions for read-through caches.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

/// A shared, type-erased loader: computes the value for a missing key.
pub type Loader<K, V> = Arc<dyn Fn(K) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

/// Wraps an async function as a [`Loader`].
pub fn from_async<K, V, F, Fut>(loader: F) -> Loader<K, V>
where
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    Arc::new(move |key| loader(key).boxed())
}

/// Wraps a blocking function as a [`Loader`].
///
/// Each call runs on the Tokio blocking pool so a slow loader never stalls
/// the async workers.
pub fn from_blocking<K, V, F>(loader: F) -> Loader<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
    F: Fn(K) -> anyhow::Result<V> + Send + Sync + 'static,
{
    let loader = Arc::new(loader);
    Arc::new(move |key| {
        let loader = Arc::clone(&loader);
        async move { tokio::task::spawn_blocking(move || loader(key)).await? }.boxed()
    })
}
