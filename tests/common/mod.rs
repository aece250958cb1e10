//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use loading_cache::{Cache, CacheBuilder};

static TRACING: Once = Once::new();

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "loading_cache=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

// == Value Generator ==
/// Loader that produces `"{key}_value_{n}"`, where `n` counts calls.
#[derive(Clone, Default)]
pub struct ValueGenerator {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl ValueGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each call sleeps for `delay` (on the Tokio clock) before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn times_called(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn next_value(&self, key: String) -> anyhow::Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(format!("{key}_value_{n}"))
    }

    /// A cache builder that loads through this generator.
    pub fn builder(&self) -> CacheBuilder<String, String> {
        let generator = self.clone();
        Cache::builder().with_loader(move |key: String| {
            let generator = generator.clone();
            async move { generator.next_value(key).await }
        })
    }
}
