//! Async usage examples

use recycling_pool::{ObjectPool, PoolConfiguration};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    println!("=== recycling_pool - Async Examples ===\n");

    // Example 1: Async acquire
    async_acquire().await;

    // Example 2: Async with timeout
    async_with_timeout().await;

    // Example 3: Concurrent access
    concurrent_access().await;
}

fn clear(buf: &mut String) -> Result<(), recycling_pool::BoxError> {
    buf.clear();
    Ok(())
}

async fn async_acquire() {
    println!("1. Async Acquire:");
    let pool = ObjectPool::new(clear, 3).unwrap();

    {
        let mut obj = pool.acquire_async().await.unwrap();
        obj.push_str("async");
        println!("   Got object {} asynchronously: {:?}", obj.id(), *obj);
    }

    println!();
}

async fn async_with_timeout() {
    println!("2. Async with Timeout:");

    let config = PoolConfiguration::new()
        .with_max_pool_size(1)
        .with_reset(clear)
        .with_timeout(Duration::from_millis(100));

    let pool = ObjectPool::with_config(config).unwrap();

    // Take the only object
    let _obj = pool.acquire().unwrap();

    // Try to get another (should time out)
    match pool.acquire_async().await {
        Ok(_) => println!("   Got object"),
        Err(e) => println!("   Error: {}", e),
    }

    println!();
}

async fn concurrent_access() {
    println!("3. Concurrent Access:");

    let config = PoolConfiguration::new()
        .with_max_pool_size(3)
        .with_reset(clear)
        .with_timeout(Duration::from_secs(1));
    let pool = ObjectPool::with_config(config).unwrap();

    let mut handles = vec![];

    for i in 0..10 {
        let pool = pool.clone();
        let handle = tokio::spawn(async move {
            if let Some(mut obj) = pool.try_acquire_async().await {
                obj.push_str(&format!("task {}", i));
                println!("   Task {} got object {}", i, obj.id());
                sleep(Duration::from_millis(50)).await;
            } else {
                println!("   Task {} couldn't get object", i);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("   Final size: {}, available: {}", pool.size(), pool.available_count());
}
