//! Core object pool implementation

use crate::config::{PoolConfiguration, ResetFn};
use crate::errors::{BoxError, PoolError, PoolResult};
#[cfg(feature = "metrics")]
use crate::metrics::MetricsExporter;
use crate::metrics::{MetricsTracker, PoolMetrics};

use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity the pool assigns to every object it creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Both collections live behind one lock so every transition between them is atomic.
struct PoolState<T> {
    available: VecDeque<(ObjectId, T)>,
    checked_out: HashSet<ObjectId>,
    next_id: u64,
    lost: usize,
}

impl<T> PoolState<T> {
    fn live(&self) -> usize {
        self.available.len() + self.checked_out.len()
    }
}

struct Shared<T> {
    state: Mutex<PoolState<T>>,
    reset: ResetFn<T>,
    capacity: usize,
    operation_timeout: Option<Duration>,
    retry_interval: Duration,
    metrics: MetricsTracker,
}

impl<T> Shared<T> {
    /// Reset `value` and move it from checked out back to available.
    ///
    /// The reset runs without the lock held. On failure the object is dropped
    /// and counts against capacity for the rest of the pool's life.
    fn give_back(&self, id: ObjectId, mut value: T) -> PoolResult<()> {
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| (self.reset)(&mut value))) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(payload) => Some(panic_message(payload)),
        };

        let mut state = self.state.lock();
        if !state.checked_out.remove(&id) {
            drop(state);
            MetricsTracker::record(&self.metrics.invalid_releases);
            warn!(object = %id, "released object is not checked out");
            return Err(PoolError::InvalidRelease);
        }

        match failure {
            None => {
                state.available.push_back((id, value));
                drop(state);
                MetricsTracker::record(&self.metrics.total_released);
                trace!(object = %id, "returned object to pool");
                Ok(())
            }
            Some(err) => {
                state.lost += 1;
                drop(state);
                drop(value);
                MetricsTracker::record(&self.metrics.cleanup_failures);
                warn!(object = %id, error = %err, "reset failed, discarding object");
                Err(PoolError::cleanup_failed(err))
            }
        }
    }

    /// Take a checked-out object out of the pool's books without returning it.
    fn forget(&self, id: ObjectId) {
        let mut state = self.state.lock();
        if state.checked_out.remove(&id) {
            state.lost += 1;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> BoxError {
    let detail = if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    };
    format!("reset panicked: {}", detail).into()
}

/// An object checked out of an [`ObjectPool`]
///
/// The object goes back to the pool when the handle is dropped. Use
/// [`ObjectPool::release`] instead to observe a failing reset.
pub struct PooledObject<T> {
    value: Option<T>,
    id: ObjectId,
    pool: Arc<Shared<T>>,
}

impl<T> PooledObject<T> {
    fn new(value: T, id: ObjectId, pool: Arc<Shared<T>>) -> Self {
        Self {
            value: Some(value),
            id,
            pool,
        }
    }

    /// Identity of the underlying object
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Take the value out of the pool for good
    ///
    /// The pool stops tracking the object and its slot is not reused.
    pub fn detach(mut self) -> T {
        let value = self.value.take().expect("Value already taken");
        self.pool.forget(self.id);
        debug!(object = %self.id, "detached object from pool");
        value
    }
}

impl<T> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T: fmt::Debug> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take()
            && let Err(err) = self.pool.give_back(self.id, value)
        {
            debug!(object = %self.id, error = %err, "object dropped without explicit release");
        }
    }
}

/// Thread-safe pool that creates objects lazily up to a fixed capacity
///
/// Clones share the same underlying pool.
///
/// # Examples
///
/// ```
/// use recycling_pool::{ObjectPool, PoolError};
///
/// let pool = ObjectPool::new(|buf: &mut Vec<u8>| { buf.clear(); Ok(()) }, 2).unwrap();
///
/// let a = pool.acquire().unwrap();
/// let _b = pool.acquire().unwrap();
/// assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted { .. })));
///
/// let id = a.id();
/// pool.release(a).unwrap();
/// assert_eq!(pool.size(), 2);
/// assert_eq!(pool.acquire().unwrap().id(), id);
/// ```
pub struct ObjectPool<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ObjectPool")
            .field("capacity", &self.shared.capacity)
            .field("available", &state.available.len())
            .field("checked_out", &state.checked_out.len())
            .field("lost", &state.lost)
            .finish()
    }
}

impl<T: Default + Send + 'static> ObjectPool<T> {
    /// Create a pool holding at most `capacity` objects
    pub fn new<F>(reset: F, capacity: usize) -> PoolResult<Self>
    where
        F: Fn(&mut T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::with_config(
            PoolConfiguration::new()
                .with_max_pool_size(capacity)
                .with_reset(reset),
        )
    }

    /// Create a pool from a configuration
    ///
    /// Fails with [`PoolError::InvalidConfiguration`] when no reset function is set.
    pub fn with_config(config: PoolConfiguration<T>) -> PoolResult<Self> {
        let reset = config.reset_fn()?;

        if config.max_pool_size == 0 {
            warn!("object pool created with zero capacity, every acquire will fail");
        }
        debug!(capacity = config.max_pool_size, "created object pool");

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    available: VecDeque::new(),
                    checked_out: HashSet::new(),
                    next_id: 0,
                    lost: 0,
                }),
                reset,
                capacity: config.max_pool_size,
                operation_timeout: config.operation_timeout,
                retry_interval: config.retry_interval,
                metrics: MetricsTracker::new(),
            }),
        })
    }

    /// Check out an object, creating one if none is available
    ///
    /// Never blocks. Fails with [`PoolError::PoolExhausted`] when nothing is
    /// available and the pool is at capacity.
    pub fn acquire(&self) -> PoolResult<PooledObject<T>> {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if let Some((id, value)) = state.available.pop_front() {
            state.checked_out.insert(id);
            drop(state);
            MetricsTracker::record(&shared.metrics.total_acquired);
            trace!(object = %id, "checked out pooled object");
            return Ok(PooledObject::new(value, id, Arc::clone(shared)));
        }

        // Lost objects keep their slot.
        if state.live() + state.lost >= shared.capacity {
            drop(state);
            MetricsTracker::record(&shared.metrics.exhausted_events);
            debug!(capacity = shared.capacity, "object pool exhausted");
            return Err(PoolError::PoolExhausted {
                capacity: shared.capacity,
            });
        }

        let id = ObjectId(state.next_id);
        state.next_id += 1;
        state.checked_out.insert(id);
        drop(state);

        let value = match panic::catch_unwind(AssertUnwindSafe(T::default)) {
            Ok(value) => value,
            Err(payload) => {
                shared.state.lock().checked_out.remove(&id);
                panic::resume_unwind(payload);
            }
        };

        MetricsTracker::record(&shared.metrics.total_created);
        MetricsTracker::record(&shared.metrics.total_acquired);
        debug!(object = %id, "created new pooled object");
        Ok(PooledObject::new(value, id, Arc::clone(shared)))
    }

    /// Same as [`ObjectPool::acquire`]
    pub fn get_object(&self) -> PoolResult<PooledObject<T>> {
        self.acquire()
    }

    /// Try to acquire an object without returning an error
    pub fn try_acquire(&self) -> Option<PooledObject<T>> {
        self.acquire().ok()
    }

    /// Acquire, waiting up to the configured timeout for an object to free up
    pub fn acquire_blocking(&self) -> PoolResult<PooledObject<T>> {
        let timeout = self.shared.operation_timeout.unwrap_or(DEFAULT_TIMEOUT);
        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();

        loop {
            match self.acquire() {
                Err(PoolError::PoolExhausted { .. }) => {}
                result => return result,
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::Timeout(timeout));
            }
            if backoff.is_completed() {
                std::thread::sleep(self.shared.retry_interval.min(deadline - now));
            } else {
                backoff.snooze();
            }
        }
    }

    /// Acquire asynchronously, waiting up to the configured timeout
    pub async fn acquire_async(&self) -> PoolResult<PooledObject<T>> {
        let timeout = self.shared.operation_timeout.unwrap_or(DEFAULT_TIMEOUT);
        let interval = self.shared.retry_interval;

        tokio::time::timeout(timeout, async {
            loop {
                match self.acquire() {
                    Err(PoolError::PoolExhausted { .. }) => {
                        tokio::time::sleep(interval).await;
                    }
                    result => return result,
                }
            }
        })
        .await
        .map_err(|_| PoolError::Timeout(timeout))?
    }

    /// Try to acquire asynchronously
    pub async fn try_acquire_async(&self) -> Option<PooledObject<T>> {
        self.acquire_async().await.ok()
    }
}

impl<T> ObjectPool<T> {
    /// Reset an object and return it to the pool
    ///
    /// Fails with [`PoolError::CleanupFailed`] if the reset fails, in which
    /// case the object is discarded. Fails with [`PoolError::InvalidRelease`]
    /// if the object was not checked out from this pool; such an object goes
    /// back to the pool it came from.
    pub fn release(&self, mut obj: PooledObject<T>) -> PoolResult<()> {
        if !Arc::ptr_eq(&obj.pool, &self.shared) {
            MetricsTracker::record(&self.shared.metrics.invalid_releases);
            warn!(object = %obj.id, "rejected release of object owned by another pool");
            return Err(PoolError::InvalidRelease);
        }

        let Some(value) = obj.value.take() else {
            return Err(PoolError::InvalidRelease);
        };
        self.shared.give_back(obj.id, value)
    }

    /// Number of live objects, available plus checked out
    pub fn size(&self) -> usize {
        self.shared.state.lock().live()
    }

    /// Maximum number of live objects
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Get available count
    pub fn available_count(&self) -> usize {
        self.shared.state.lock().available.len()
    }

    /// Get checked-out count
    pub fn checked_out_count(&self) -> usize {
        self.shared.state.lock().checked_out.len()
    }

    /// Objects discarded after a failed reset or detached by their holder
    pub fn lost_count(&self) -> usize {
        self.shared.state.lock().lost
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        let (checked_out, available, lost) = {
            let state = self.shared.state.lock();
            (state.checked_out.len(), state.available.len(), state.lost)
        };
        self.shared
            .metrics
            .get_metrics(checked_out, available, lost, self.shared.capacity)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Buffer {
        data: Vec<u8>,
        dirty: bool,
    }

    fn clear_buffer(buf: &mut Buffer) -> Result<(), BoxError> {
        buf.data.clear();
        buf.dirty = false;
        Ok(())
    }

    #[test]
    fn test_missing_reset_is_rejected() {
        let result = ObjectPool::<Buffer>::with_config(PoolConfiguration::new());
        assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_objects_created_lazily() {
        let pool = ObjectPool::new(clear_buffer, 4).unwrap();
        assert_eq!(pool.size(), 0);

        let obj = pool.acquire().unwrap();
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.checked_out_count(), 1);
        drop(obj);

        assert_eq!(pool.size(), 1);
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_exhausted_after_capacity_acquires() {
        let pool = ObjectPool::new(clear_buffer, 3).unwrap();
        let held: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();

        assert!(matches!(
            pool.acquire(),
            Err(PoolError::PoolExhausted { capacity: 3 })
        ));
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.size(), 3);
        drop(held);
    }

    #[test]
    fn test_zero_capacity_is_always_exhausted() {
        let pool = ObjectPool::new(clear_buffer, 0).unwrap();
        assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted { .. })));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_reset_runs_before_reuse() {
        let pool = ObjectPool::new(clear_buffer, 1).unwrap();

        let mut obj = pool.acquire().unwrap();
        obj.data.extend_from_slice(b"payload");
        obj.dirty = true;
        pool.release(obj).unwrap();

        let obj = pool.acquire().unwrap();
        assert!(obj.data.is_empty());
        assert!(!obj.dirty);
    }

    #[test]
    fn test_reset_runs_once_per_release() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = ObjectPool::new(
            move |_: &mut Buffer| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            2,
        )
        .unwrap();

        let a = pool.acquire().unwrap();
        pool.release(a).unwrap();
        let b = pool.acquire().unwrap();
        drop(b);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capacity_two_scenario() {
        let pool = ObjectPool::new(clear_buffer, 2).unwrap();

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted { .. })));

        let a_id = a.id();
        pool.release(a).unwrap();
        assert_eq!(pool.size(), 2);

        let again = pool.acquire().unwrap();
        assert_eq!(again.id(), a_id);
        assert_eq!(pool.size(), 2);
        drop(b);
    }

    #[test]
    fn test_available_is_fifo() {
        let pool = ObjectPool::new(clear_buffer, 3).unwrap();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let (a_id, b_id) = (a.id(), b.id());

        pool.release(b).unwrap();
        pool.release(a).unwrap();

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert_eq!(first.id(), b_id);
        assert_eq!(second.id(), a_id);
    }

    #[test]
    fn test_failed_reset_loses_object() {
        let pool = ObjectPool::new(
            |buf: &mut Buffer| {
                if buf.dirty {
                    return Err("buffer is corrupt".into());
                }
                Ok(())
            },
            2,
        )
        .unwrap();

        let mut bad = pool.acquire().unwrap();
        let good = pool.acquire().unwrap();
        bad.dirty = true;
        let bad_id = bad.id();

        let err = pool.release(bad).unwrap_err();
        assert!(matches!(err, PoolError::CleanupFailed(_)));
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.lost_count(), 1);

        // The lost slot is not handed out again.
        assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted { .. })));

        pool.release(good).unwrap();
        let next = pool.acquire().unwrap();
        assert_ne!(next.id(), bad_id);
        assert_eq!(pool.get_metrics().cleanup_failures, 1);
    }

    #[test]
    fn test_panicking_reset_is_cleanup_failure() {
        let pool = ObjectPool::new(
            |_: &mut Buffer| -> Result<(), BoxError> { panic!("reset exploded") },
            1,
        )
        .unwrap();

        let obj = pool.acquire().unwrap();
        let err = pool.release(obj).unwrap_err();
        assert!(err.to_string().contains("reset exploded"));
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.checked_out_count(), 0);
    }

    #[test]
    fn test_release_to_wrong_pool() {
        let pool = ObjectPool::new(clear_buffer, 2).unwrap();
        let other = ObjectPool::new(clear_buffer, 2).unwrap();

        let foreign = other.acquire().unwrap();
        assert!(matches!(pool.release(foreign), Err(PoolError::InvalidRelease)));
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.get_metrics().invalid_releases, 1);

        // The rejected handle went back to its own pool when dropped.
        assert_eq!(other.available_count(), 1);
        assert_eq!(other.checked_out_count(), 0);
    }

    #[test]
    fn test_detach_removes_object() {
        let pool = ObjectPool::new(clear_buffer, 2).unwrap();
        let mut obj = pool.acquire().unwrap();
        obj.data.push(1);

        let owned = obj.detach();
        assert_eq!(owned.data, vec![1]);
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.lost_count(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let pool = ObjectPool::new(clear_buffer, 1).unwrap();
        let clone = pool.clone();

        let obj = pool.acquire().unwrap();
        assert!(clone.try_acquire().is_none());
        clone.release(obj).unwrap();
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_acquire_blocking_times_out() {
        let config = PoolConfiguration::new()
            .with_max_pool_size(1)
            .with_reset(clear_buffer)
            .with_timeout(Duration::from_millis(30))
            .with_retry_interval(Duration::from_millis(5));
        let pool = ObjectPool::with_config(config).unwrap();

        let _held = pool.acquire().unwrap();
        assert!(matches!(pool.acquire_blocking(), Err(PoolError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_async_acquire() {
        let pool = ObjectPool::new(clear_buffer, 1).unwrap();

        let obj = pool.acquire_async().await.unwrap();
        let id = obj.id();
        drop(obj);

        let obj = pool.acquire_async().await.unwrap();
        assert_eq!(obj.id(), id);
    }

    #[tokio::test]
    async fn test_async_acquire_waits_for_release() {
        let config = PoolConfiguration::new()
            .with_max_pool_size(1)
            .with_reset(clear_buffer)
            .with_timeout(Duration::from_secs(5))
            .with_retry_interval(Duration::from_millis(5));
        let pool = ObjectPool::with_config(config).unwrap();

        let held = pool.acquire().unwrap();
        let releaser = pool.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            releaser.release(held).unwrap();
        });

        let obj = pool.acquire_async().await.unwrap();
        assert_eq!(pool.checked_out_count(), 1);
        drop(obj);
    }

    #[tokio::test]
    async fn test_async_acquire_times_out() {
        let config = PoolConfiguration::new()
            .with_max_pool_size(0)
            .with_reset(clear_buffer)
            .with_timeout(Duration::from_millis(20));
        let pool = ObjectPool::with_config(config).unwrap();

        assert!(pool.try_acquire_async().await.is_none());
    }
}
