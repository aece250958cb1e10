//! Configuration Module
//!
//! Holds the construction-time options of a cache. Options can be assembled in
//! code, deserialized with serde, or loaded from environment variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Environment Variables ==
pub const ENV_INITIAL_CAPACITY: &str = "CACHE_INITIAL_CAPACITY";
pub const ENV_MAX_ENTRIES: &str = "CACHE_MAX_ENTRIES";
pub const ENV_EXPIRATION_MS: &str = "CACHE_EXPIRATION_MS";
pub const ENV_PURGE_INTERVAL_MS: &str = "CACHE_PURGE_INTERVAL_MS";

/// Cache configuration parameters.
///
/// Every option is optional; an empty config describes an unbounded cache
/// whose entries never expire. Durations are serialized as milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Sizing hint for the backing map; no behavioral effect
    pub initial_capacity: Option<usize>,
    /// Maximum number of entries; the oldest write is evicted beyond it
    pub max_entries: Option<usize>,
    /// Time-to-live counted from an entry's last write
    #[serde(rename = "expiration_ms", with = "opt_millis")]
    pub expiration: Option<Duration>,
    /// Interval of the background sweep for expired entries
    #[serde(rename = "purge_interval_ms", with = "opt_millis")]
    pub purge_interval: Option<Duration>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_INITIAL_CAPACITY` - Backing map sizing hint
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (must be > 0)
    /// - `CACHE_EXPIRATION_MS` - Entry TTL in milliseconds
    /// - `CACHE_PURGE_INTERVAL_MS` - Background sweep frequency in milliseconds
    ///
    /// Unset variables leave the option unset. A variable that is set but is
    /// not a non-negative integer is an error, as is any value rejected by
    /// [`CacheConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |name: &str| -> Result<Option<u64>> {
            match lookup(name) {
                None => Ok(None),
                Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
                    CacheError::InvalidConfig(format!(
                        "{name} must be a non-negative integer, got {raw:?}"
                    ))
                }),
            }
        };

        let count = |name: &str| -> Result<Option<usize>> {
            number(name)?
                .map(|n| {
                    usize::try_from(n).map_err(|_| {
                        CacheError::InvalidConfig(format!(
                            "{name} is too large for this platform, got {n}"
                        ))
                    })
                })
                .transpose()
        };

        let config = Self {
            initial_capacity: count(ENV_INITIAL_CAPACITY)?,
            max_entries: count(ENV_MAX_ENTRIES)?,
            expiration: number(ENV_EXPIRATION_MS)?.map(Duration::from_millis),
            purge_interval: number(ENV_PURGE_INTERVAL_MS)?.map(Duration::from_millis),
        };
        config.validate()?;
        Ok(config)
    }

    // == Validate ==
    /// Rejects options that can never describe a working cache.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == Some(0) {
            return Err(CacheError::InvalidConfig(
                "max_entries must be > 0 if set".to_string(),
            ));
        }
        if self.purge_interval == Some(Duration::ZERO) {
            return Err(CacheError::InvalidConfig(
                "purge_interval must be > 0 if set".to_string(),
            ));
        }
        Ok(())
    }

    /// The purge interval, if a sweep should actually run.
    ///
    /// A purge interval without an expiration has nothing to sweep.
    pub fn effective_purge_interval(&self) -> Option<Duration> {
        self.expiration.and(self.purge_interval)
    }
}

/// Serde adapter storing `Option<Duration>` as whole milliseconds.
mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
