//! Integration Tests for Concurrent Access
//!
//! Checks load coalescing and how writes interleave with loads in flight.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{init_tracing, ValueGenerator};
use loading_cache::{Cache, CacheError};
use tokio::sync::{Barrier, Notify};

/// Runs `count` concurrent `get(key)` calls, released together.
async fn concurrent_gets(
    cache: &Arc<Cache<String, String>>,
    key: &str,
    count: usize,
) -> Vec<Result<String, CacheError>> {
    let barrier = Arc::new(Barrier::new(count));
    let mut handles = Vec::with_capacity(count);

    for _ in 0..count {
        let cache = Arc::clone(cache);
        let barrier = Arc::clone(&barrier);
        let key = key.to_string();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            cache.get(&key).await
        }));
    }

    let mut results = Vec::with_capacity(count);
    for handle in handles {
        results.push(handle.await.expect("Task should not panic"));
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_multiple_requests_for_new_value_are_coalesced() {
    init_tracing();
    let generator = ValueGenerator::with_delay(Duration::from_millis(200));
    let cache = Arc::new(generator.builder().build().unwrap());

    let results = concurrent_gets(&cache, "key", 8).await;

    assert_eq!(generator.times_called(), 1);
    for result in results {
        assert_eq!(result.unwrap(), "key_value_1");
    }
    assert_eq!(cache.pending_loads().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_requests_are_coalesced_when_replacing_expired_value() {
    let generator = ValueGenerator::with_delay(Duration::from_millis(200));
    let cache = Arc::new(
        generator
            .builder()
            .with_expiration(Duration::from_millis(100))
            .with_background_purge(Duration::from_millis(500))
            .build()
            .unwrap(),
    );

    cache.set("key".to_string(), "old".to_string()).await;
    tokio::time::sleep(Duration::from_millis(110)).await;

    let results = concurrent_gets(&cache, "key", 3).await;

    assert_eq!(generator.times_called(), 1);
    for result in results {
        assert_eq!(result.unwrap(), "key_value_1");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_keys_load_independently() {
    let generator = ValueGenerator::with_delay(Duration::from_millis(50));
    let cache = Arc::new(generator.builder().build().unwrap());

    let (a, b) = tokio::join!(concurrent_gets(&cache, "a", 4), concurrent_gets(&cache, "b", 4));

    assert_eq!(generator.times_called(), 2);
    let a: Vec<String> = a.into_iter().map(Result::unwrap).collect();
    let b: Vec<String> = b.into_iter().map(Result::unwrap).collect();
    assert!(a.windows(2).all(|w| w[0] == w[1]));
    assert!(b.windows(2).all(|w| w[0] == w[1]));
    assert!(a[0].starts_with("a_value_"));
    assert!(b[0].starts_with("b_value_"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_failure_reaches_every_waiter() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache: Arc<Cache<String, String>> = {
        let calls = Arc::clone(&calls);
        Arc::new(
            Cache::builder()
                .with_loader(move |_key: String| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err::<String, _>(anyhow::anyhow!("upstream timed out"))
                    }
                })
                .build()
                .unwrap(),
        )
    };

    let results = concurrent_gets(&cache, "key", 5).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(err, CacheError::LoadFailed(_)));
        assert_eq!(err.load_error().unwrap().to_string(), "upstream timed out");
    }
    assert!(!cache.contains_key("key").await);
    assert_eq!(cache.pending_loads().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_loader_panic_is_reported_and_cleared() {
    let cache: Cache<String, String> = Cache::builder()
        .with_loader(|key: String| async move {
            if key == "bad" {
                panic!("loader blew up");
            }
            Ok::<_, anyhow::Error>(key)
        })
        .build()
        .unwrap();

    let err = cache.get("bad").await.unwrap_err();
    assert!(matches!(err, CacheError::LoadAborted(ref msg) if msg.contains("loader blew up")));
    assert_eq!(cache.pending_loads().await, 0);

    assert_eq!(cache.get("good").await.unwrap(), "good");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_set_proceeds_while_load_in_flight() {
    let release = Arc::new(Notify::new());
    let cache: Arc<Cache<String, String>> = {
        let release = Arc::clone(&release);
        Arc::new(
            Cache::builder()
                .with_loader(move |key: String| {
                    let release = Arc::clone(&release);
                    async move {
                        release.notified().await;
                        Ok::<_, anyhow::Error>(format!("{key}_loaded"))
                    }
                })
                .build()
                .unwrap(),
        )
    };

    let loading = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("key").await })
    };
    while cache.pending_loads().await == 0 {
        tokio::task::yield_now().await;
    }

    // Neither the write nor the lookups wait for the stalled loader
    cache.set("key".to_string(), "explicit".to_string()).await;
    assert_eq!(cache.get("key").await.unwrap(), "explicit");
    cache.set("other".to_string(), "v".to_string()).await;
    cache.remove("other").await;
    assert!(cache.contains_key("key").await);

    release.notify_one();

    // The waiter gets the load's own result, which then overwrites the set
    assert_eq!(loading.await.unwrap().unwrap(), "key_loaded");
    assert_eq!(cache.get("key").await.unwrap(), "key_loaded");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remove_same_key_while_load_in_flight() {
    let release = Arc::new(Notify::new());
    let cache: Arc<Cache<String, String>> = {
        let release = Arc::clone(&release);
        Arc::new(
            Cache::builder()
                .with_loader(move |key: String| {
                    let release = Arc::clone(&release);
                    async move {
                        release.notified().await;
                        Ok::<_, anyhow::Error>(format!("{key}_loaded"))
                    }
                })
                .build()
                .unwrap(),
        )
    };

    cache.set("key".to_string(), "stale".to_string()).await;
    cache.remove("key").await;

    let loading = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("key").await })
    };
    while cache.pending_loads().await == 0 {
        tokio::task::yield_now().await;
    }

    // Removing the key being loaded does not wait for the loader
    cache.remove("key").await;
    assert!(!cache.contains_key("key").await);
    assert_eq!(cache.len().await, 0);
    assert_eq!(cache.pending_loads().await, 1);

    release.notify_one();

    // The load still answers its waiter and stores its value
    assert_eq!(loading.await.unwrap().unwrap(), "key_loaded");
    assert_eq!(cache.pending_loads().await, 0);
    assert!(cache.contains_key("key").await);
    assert_eq!(cache.get("key").await.unwrap(), "key_loaded");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_completes_when_waiter_is_dropped() {
    let generator = ValueGenerator::with_delay(Duration::from_millis(50));
    let cache = Arc::new(generator.builder().build().unwrap());

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("key").await })
    };
    while cache.pending_loads().await == 0 {
        tokio::task::yield_now().await;
    }
    waiter.abort();

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(cache.pending_loads().await, 0);
    assert_eq!(cache.get("key").await.unwrap(), "key_value_1");
    assert_eq!(generator.times_called(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_operations_keep_capacity() {
    let generator = ValueGenerator::new();
    let cache = Arc::new(generator.builder().with_maximum_entries(16).build().unwrap());

    let mut handles = Vec::new();
    for worker in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for i in 0..200 {
                let key = format!("k{}", (i * 7 + worker) % 40);
                match i % 4 {
                    0 => cache.set(key, format!("w{worker}")).await,
                    1 => cache.remove(&key).await,
                    _ => {
                        cache.get(&key).await.unwrap();
                    }
                }
                assert!(cache.len().await <= 16);
            }
        }));
    }
    for handle in handles {
        handle.await.expect("Task should not panic");
    }

    assert!(cache.len().await <= 16);
    assert_eq!(cache.pending_loads().await, 0);
}
