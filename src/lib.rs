//! async-cache - An in-process TTL cache with single-flight reads
//!
//! This library provides a cache that:
//! - Stores one value per key, optionally expiring it after a fixed TTL
//! - Lets a scheduler mark a key as refreshing while it recomputes the value
//! - Parks every read of a refreshing key until the scheduler sets or flushes it
//! - Isolates failing subscriber callbacks and reports them to a diagnostic sink
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use async_cache::AsyncCache;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache: AsyncCache<String> = AsyncCache::new(Some(Duration::from_secs(60)));
//!
//!     if cache.is_expired("user:123") {
//!         cache.refresh("user:123");
//!
//!         let reader = {
//!             let cache = cache.clone();
//!             tokio::spawn(async move { cache.get("user:123").await })
//!         };
//!         while cache.pending("user:123") == 0 {
//!             tokio::task::yield_now().await;
//!         }
//!
//!         // Load from database, then publish to every waiting reader
//!         cache.set("user:123", "User data for user:123".to_string());
//!
//!         let user = reader.await.unwrap().unwrap();
//!         assert_eq!(user.as_deref(), Some("User data for user:123"));
//!     }
//! }
//! ```

mod builder;
mod cache;
mod config;
mod diagnostics;
mod entry;
mod error;
mod subscription;

// Re-export public API
pub use builder::CacheBuilder;
pub use cache::AsyncCache;
pub use config::{CacheConfig, DEFAULT_TTL_MS};
pub use diagnostics::{CallbackKind, Diagnostic, DiagnosticSink, TracingSink};
pub use entry::{Entry, Expiration};
pub use error::{CacheError, CallbackError, CallbackResult, ERROR_CACHE_RECORD_FLUSHED};
pub use subscription::{
    FailureCallback, Notification, Subscriber, SubscriptionRegistry, SuccessCallback,
};
