//! Example demonstrating a scheduler driving refreshes while readers wait.
//!
//! The scheduler is the only task that decides to refresh: it sees the key
//! expired, marks it refreshing, and only then lets readers in, so every
//! reader is parked on that one load and receives the same value. A second
//! key is flushed mid-refresh to show how waiting readers are rejected.

use async_cache::{AsyncCache, CacheBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct User {
    id: String,
    name: String,
}

async fn load_user(id: &str, loads: &AtomicUsize) -> User {
    loads.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    User {
        id: id.to_string(),
        name: format!("User {}", id),
    }
}

/// Refresh `id` if it is expired and load it in the background.
///
/// Must be called from a single task; two schedulers racing on the same key
/// would both see it expired and load it twice.
fn schedule_refresh(
    cache: &AsyncCache<User>,
    loads: &Arc<AtomicUsize>,
    id: &str,
) -> Option<tokio::task::JoinHandle<()>> {
    if !cache.is_expired(id) {
        return None;
    }
    cache.refresh(id);

    let cache = cache.clone();
    let loads = loads.clone();
    let id = id.to_string();
    Some(tokio::spawn(async move {
        let user = load_user(&id, &loads).await;
        cache.set(&id, user);
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let cache: AsyncCache<User> = CacheBuilder::new().ttl(Duration::from_secs(30)).build();
    let loads = Arc::new(AtomicUsize::new(0));

    let producer = schedule_refresh(&cache, &loads, "chronark");

    let readers: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("chronark").await })
        })
        .collect();

    for reader in readers {
        if let Some(user) = reader.await?? {
            println!("reader got {} ({})", user.name, user.id);
        }
    }
    if let Some(producer) = producer {
        producer.await?;
    }

    // Fresh now, so the scheduler leaves it alone
    assert!(schedule_refresh(&cache, &loads, "chronark").is_none());
    println!("database loads: {}", loads.load(Ordering::SeqCst));

    // Invalidate a key while readers are parked on it
    cache.refresh("deleted");
    let parked = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("deleted").await })
    };
    while cache.pending("deleted") == 0 {
        tokio::task::yield_now().await;
    }
    cache.flush("deleted");

    match parked.await? {
        Err(e) => println!("parked reader rejected: {}", e),
        Ok(value) => println!("parked reader unexpectedly got {:?}", value),
    }

    Ok(())
}
