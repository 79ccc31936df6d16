//! # recycling_pool
//!
//! Bounded, thread-safe pool of reusable objects. Objects are created lazily
//! with `Default`, handed out exclusively, and run through a caller-supplied
//! reset before they can be handed out again.
//!
//! ## Features
//!
//! - Lazy creation up to a fixed capacity
//! - Reset on every return; objects whose reset fails are discarded
//! - Automatic return of objects via RAII (Drop trait)
//! - Non-blocking acquire, plus blocking and async helpers with timeout
//! - Metrics with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use recycling_pool::ObjectPool;
//!
//! let pool = ObjectPool::new(|s: &mut String| { s.clear(); Ok(()) }, 8).unwrap();
//! {
//!     let mut obj = pool.acquire().unwrap();
//!     obj.push_str("scratch");
//!     // Object is reset and returned when `obj` goes out of scope
//! }
//! assert_eq!(pool.available_count(), 1);
//! assert!(pool.acquire().unwrap().is_empty());
//! ```

mod config;
mod errors;
mod metrics;
mod pool;

pub use config::{PoolConfiguration, ResetFn};
pub use errors::{BoxError, PoolError, PoolResult};
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{ObjectId, ObjectPool, PooledObject};
