//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// The type is `Clone` because a single load outcome is handed to every
/// caller coalesced on that load.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// A configuration option is out of range or could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A background task was requested outside of a Tokio runtime
    #[error("Runtime unavailable: {0}")]
    Runtime(String),

    /// The loader function returned an error
    #[error("Loader failed: {0:#}")]
    LoadFailed(Arc<anyhow::Error>),

    /// The loader function panicked or its task was cancelled
    #[error("Load aborted: {0}")]
    LoadAborted(String),
}

impl CacheError {
    /// Returns the loader's own error, if this is a load failure.
    ///
    /// Useful for downcasting to the concrete error the loader produced.
    pub fn load_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::LoadFailed(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "loader panicked".to_string()
        };
        CacheError::LoadAborted(message)
    }
}

impl From<anyhow::Error> for CacheError {
    fn from(err: anyhow::Error) -> Self {
        CacheError::LoadFailed(Arc::new(err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
