//! Cache Module
//!
//! Provides the concurrent cache engine with read-through loading, TTL
//! expiration and write-ordered eviction.

mod engine;
mod entry;
mod eviction;
mod flight;
pub mod loader;
mod store;


// Re-export public types
pub use engine::Cache;
pub use entry::CacheEntry;
pub use eviction::EvictionQueue;
pub use loader::Loader;
pub use store::Store;

pub(crate) use engine::Inner;
