//! Error types for the object pool

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Error type a reset function reports when it cannot restore an object
pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Pool exhausted - capacity of {capacity} reached")]
    PoolExhausted { capacity: usize },

    #[error("Cleanup of returned object failed: {0}")]
    CleanupFailed(#[source] Arc<dyn StdError + Send + Sync>),

    #[error("Object is not checked out from this pool")]
    InvalidRelease,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl PoolError {
    pub(crate) fn cleanup_failed(err: BoxError) -> Self {
        PoolError::CleanupFailed(Arc::from(err))
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, PoolError::PoolExhausted { .. } | PoolError::Timeout(_))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
