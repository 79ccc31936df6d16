//! Pool configuration options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{BoxError, PoolError, PoolResult};

/// Reset step applied to every object on its way back into the pool
pub type ResetFn<T> = Arc<dyn Fn(&mut T) -> Result<(), BoxError> + Send + Sync>;

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use recycling_pool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::<Vec<u8>>::new()
///     .with_max_pool_size(16)
///     .with_reset(|buf: &mut Vec<u8>| {
///         buf.clear();
///         Ok(())
///     })
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.max_pool_size, 16);
/// assert!(config.validate().is_ok());
/// ```
pub struct PoolConfiguration<T> {
    /// Maximum number of live objects (available + checked out)
    pub max_pool_size: usize,

    /// Reset function run on every returned object. Required.
    pub reset: Option<ResetFn<T>>,

    /// Deadline for the waiting acquire helpers
    pub operation_timeout: Option<Duration>,

    /// Pause between retries while waiting for a free object
    pub retry_interval: Duration,
}

impl<T> Default for PoolConfiguration<T> {
    fn default() -> Self {
        Self {
            max_pool_size: 100,
            reset: None,
            operation_timeout: Some(Duration::from_secs(30)),
            retry_interval: Duration::from_millis(10),
        }
    }
}

impl<T> Clone for PoolConfiguration<T> {
    fn clone(&self) -> Self {
        Self {
            max_pool_size: self.max_pool_size,
            reset: self.reset.clone(),
            operation_timeout: self.operation_timeout,
            retry_interval: self.retry_interval,
        }
    }
}

impl<T> fmt::Debug for PoolConfiguration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfiguration")
            .field("max_pool_size", &self.max_pool_size)
            .field("reset", &self.reset.as_ref().map(|_| "<fn>"))
            .field("operation_timeout", &self.operation_timeout)
            .field("retry_interval", &self.retry_interval)
            .finish()
    }
}

impl<T> PoolConfiguration<T> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum pool size
    ///
    /// A size of zero is accepted and produces a pool that is always exhausted.
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the reset function
    pub fn with_reset<F>(mut self, reset: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.reset = Some(Arc::new(reset));
        self
    }

    /// Set operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Set the pause between acquire retries
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Check that the configuration can build a pool
    ///
    /// ```
    /// use recycling_pool::{PoolConfiguration, PoolError};
    ///
    /// let config = PoolConfiguration::<String>::new();
    /// assert!(matches!(config.validate(), Err(PoolError::InvalidConfiguration(_))));
    /// ```
    pub fn validate(&self) -> PoolResult<()> {
        self.reset_fn().map(|_| ())
    }

    pub(crate) fn reset_fn(&self) -> PoolResult<ResetFn<T>> {
        self.reset.clone().ok_or_else(|| {
            PoolError::InvalidConfiguration("a reset function is required".to_string())
        })
    }
}
