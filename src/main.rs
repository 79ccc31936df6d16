// recycling_pool demo binary
// The library lives in lib.rs. Run the demos with: cargo run --example basic

use recycling_pool::ObjectPool;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== recycling_pool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    println!("Quick Demo:");
    let pool = match ObjectPool::new(
        |buf: &mut Vec<u8>| {
            buf.clear();
            Ok(())
        },
        2,
    ) {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("  Could not create pool: {}", err);
            return;
        }
    };

    {
        match pool.acquire() {
            Ok(mut obj) => {
                obj.extend_from_slice(b"hello");
                println!("  Got object {} holding {} bytes", obj.id(), obj.len());
            }
            Err(err) => println!("  Acquire failed: {}", err),
        }
    }

    println!("  Size after return: {}", pool.size());
    println!("  Available after return: {}", pool.available_count());
}
