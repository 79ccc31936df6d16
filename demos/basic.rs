//! Basic usage examples for ObjectPool

use recycling_pool::{BoxError, ObjectPool, PoolConfiguration, PoolError};

#[derive(Debug, Default)]
struct Connection {
    buffer: Vec<u8>,
    broken: bool,
}

fn reset_connection(conn: &mut Connection) -> Result<(), BoxError> {
    if conn.broken {
        return Err("connection is broken".into());
    }
    conn.buffer.clear();
    Ok(())
}

fn main() {
    println!("=== recycling_pool - Basic Examples ===\n");

    // Example 1: Acquire and release
    simple_pool();

    // Example 2: Capacity limits
    exhaustion();

    // Example 3: Failed resets
    failed_reset();

    // Example 4: Metrics
    metrics();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = ObjectPool::new(reset_connection, 4).unwrap();

    {
        let mut conn = pool.acquire().unwrap();
        conn.buffer.extend_from_slice(b"GET / HTTP/1.1");
        println!("   Got connection {} ({} bytes buffered)", conn.id(), conn.buffer.len());
        // Returned and reset when dropped
    }

    let conn = pool.acquire().unwrap();
    println!("   Reused connection {} ({} bytes buffered)", conn.id(), conn.buffer.len());
    pool.release(conn).unwrap();
    println!("   Size after release: {}\n", pool.size());
}

fn exhaustion() {
    println!("2. Capacity Limits:");
    let config = PoolConfiguration::new()
        .with_max_pool_size(2)
        .with_reset(reset_connection);
    let pool = ObjectPool::with_config(config).unwrap();

    let a = pool.acquire().unwrap();
    let _b = pool.acquire().unwrap();
    match pool.acquire() {
        Err(PoolError::PoolExhausted { capacity }) => {
            println!("   Pool exhausted at capacity {}", capacity)
        }
        other => println!("   Unexpected: {:?}", other.map(|c| c.id())),
    }

    pool.release(a).unwrap();
    println!("   After one release - available: {}\n", pool.available_count());
}

fn failed_reset() {
    println!("3. Failed Resets:");
    let pool = ObjectPool::new(reset_connection, 2).unwrap();

    let mut conn = pool.acquire().unwrap();
    conn.broken = true;
    if let Err(e) = pool.release(conn) {
        println!("   Release failed: {}", e);
    }
    println!("   Size: {}, lost: {}\n", pool.size(), pool.lost_count());
}

fn metrics() {
    println!("4. Metrics:");
    let pool = ObjectPool::new(reset_connection, 5).unwrap();

    {
        let _c1 = pool.acquire().unwrap();
        let _c2 = pool.acquire().unwrap();
        let metrics = pool.get_metrics();
        println!("   Utilization: {:.1}%", metrics.utilization * 100.0);
    }

    let mut exported: Vec<_> = pool.export_metrics().into_iter().collect();
    exported.sort();
    println!("\n   Metrics:");
    for (key, value) in exported {
        println!("     {}: {}", key, value);
    }

    prometheus_text(&pool);
}

#[cfg(feature = "metrics")]
fn prometheus_text(pool: &ObjectPool<Connection>) {
    match pool.export_metrics_prometheus("connections", None) {
        Ok(text) => println!("\n{}", text),
        Err(e) => println!("   Prometheus export failed: {}", e),
    }
}

#[cfg(not(feature = "metrics"))]
fn prometheus_text(_pool: &ObjectPool<Connection>) {}
