//! Metrics collection and export for object pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use recycling_pool::ObjectPool;
///
/// let pool = ObjectPool::new(|s: &mut String| { s.clear(); Ok(()) }, 3).unwrap();
///
/// {
///     let _obj = pool.acquire().unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_acquired, 1);
///     assert_eq!(metrics.total_created, 1);
///     assert_eq!(metrics.checked_out_objects, 1);
/// }
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total successful acquires
    pub total_acquired: usize,

    /// Total objects reset and put back
    pub total_released: usize,

    /// Total objects constructed by the pool
    pub total_created: usize,

    /// Number of acquires rejected because the pool was at capacity
    pub exhausted_events: usize,

    /// Resets that failed, discarding the object
    pub cleanup_failures: usize,

    /// Releases rejected because the object was not checked out here
    pub invalid_releases: usize,

    /// Objects currently checked out
    pub checked_out_objects: usize,

    /// Objects currently ready to hand out
    pub available_objects: usize,

    /// Objects removed from the pool for good
    pub lost_objects: usize,

    /// Checked-out share of capacity (0.0 to 1.0)
    pub utilization: f64,

    /// Maximum pool capacity
    pub max_capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("cleanup_failures".to_string(), self.cleanup_failures.to_string());
        metrics.insert("invalid_releases".to_string(), self.invalid_releases.to_string());
        metrics.insert("checked_out_objects".to_string(), self.checked_out_objects.to_string());
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("lost_objects".to_string(), self.lost_objects.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use recycling_pool::ObjectPool;
    /// use std::collections::HashMap;
    ///
    /// let pool = ObjectPool::new(|v: &mut Vec<u8>| { v.clear(); Ok(()) }, 3).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("buffers", Some(&tags)).unwrap();
    /// assert!(output.contains("objectpool_objects_checked_out"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let registry = Registry::new();
        let opts = |name: &str, help: &str| {
            let mut opts = Opts::new(name, help).const_label("pool", pool_name);
            if let Some(tags) = tags {
                for (key, value) in tags {
                    opts = opts.const_label(key.as_str(), value.as_str());
                }
            }
            opts
        };

        // Gauge metrics
        let gauges = [
            ("objectpool_objects_checked_out", "Current checked-out objects", metrics.checked_out_objects),
            ("objectpool_objects_available", "Current available objects", metrics.available_objects),
            ("objectpool_objects_lost", "Objects discarded from the pool", metrics.lost_objects),
            ("objectpool_capacity", "Maximum pool capacity", metrics.max_capacity),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(opts(name, help))?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge))?;
        }

        let utilization = Gauge::with_opts(opts("objectpool_utilization", "Pool utilization ratio"))?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization))?;

        // Counter metrics
        let counters = [
            ("objectpool_objects_acquired_total", "Total objects acquired", metrics.total_acquired),
            ("objectpool_objects_released_total", "Total objects released", metrics.total_released),
            ("objectpool_objects_created_total", "Total objects created", metrics.total_created),
            ("objectpool_events_exhausted_total", "Pool exhausted events", metrics.exhausted_events),
            ("objectpool_cleanup_failures_total", "Failed resets", metrics.cleanup_failures),
            ("objectpool_invalid_releases_total", "Rejected releases", metrics.invalid_releases),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(opts(name, help))?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter))?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub total_created: AtomicUsize,
    pub exhausted_events: AtomicUsize,
    pub cleanup_failures: AtomicUsize,
    pub invalid_releases: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            total_acquired: AtomicUsize::new(0),
            total_released: AtomicUsize::new(0),
            total_created: AtomicUsize::new(0),
            exhausted_events: AtomicUsize::new(0),
            cleanup_failures: AtomicUsize::new(0),
            invalid_releases: AtomicUsize::new(0),
        }
    }

    pub fn record(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(
        &self,
        checked_out: usize,
        available: usize,
        lost: usize,
        capacity: usize,
    ) -> PoolMetrics {
        let utilization = if capacity > 0 {
            checked_out as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            total_created: self.total_created.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
            invalid_releases: self.invalid_releases.load(Ordering::Relaxed),
            checked_out_objects: checked_out,
            available_objects: available,
            lost_objects: lost,
            utilization,
            max_capacity: capacity,
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}
