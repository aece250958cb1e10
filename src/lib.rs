//! Loading Cache - An in-process key-value cache
//!
//! Provides read-through loading with per-key load coalescing, TTL expiration
//! and oldest-write eviction.

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod single;
mod tasks;

pub use builder::{CacheBuilder, SingleValueCacheBuilder};
pub use cache::Cache;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use single::SingleValueCache;
