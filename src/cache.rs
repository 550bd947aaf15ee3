use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::entry::{Entry, Expiration};
use crate::error::CacheError;
use crate::subscription::{Notification, Subscriber, SubscriptionRegistry, Waiter};

/// Outcome of looking a key up under the entries lock.
enum Lookup<V> {
    Ready(Option<V>),
    Pending(Waiter<V>),
}

struct Inner<V> {
    /// Lock order: `entries` first, then the registry's own lock.
    entries: Mutex<HashMap<String, Entry<V>>>,
    subscriptions: SubscriptionRegistry<V>,
    ttl: Option<Duration>,
}

/// In-process cache that coalesces reads of keys being refreshed.
///
/// The cache never computes values itself. A scheduler marks a key with
/// [`refresh`](AsyncCache::refresh), produces the value, and installs it with
/// [`set`](AsyncCache::set). Every [`get`](AsyncCache::get) issued in between
/// waits for that single result, or fails with
/// [`CacheError::RecordFlushed`] if the key is [`flush`](AsyncCache::flush)ed
/// first.
///
/// A pending `get` has no deadline. If the key is never set or flushed it
/// waits forever; use [`get_with_timeout`](AsyncCache::get_with_timeout) to
/// bound the wait.
///
/// Clones share the same entries and waiters.
pub struct AsyncCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for AsyncCache<V> {
    fn clone(&self) -> Self {
        AsyncCache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for AsyncCache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl<V> AsyncCache<V>
where
    V: Clone + Send + 'static,
{
    /// Create an empty cache.
    ///
    /// # Arguments
    /// * `ttl` - Time before a written entry expires, `None` to never expire
    pub fn new(ttl: Option<Duration>) -> Self {
        Self::with_sink(ttl, Arc::new(TracingSink))
    }

    /// Create an empty cache from a configuration value.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    /// Create an empty cache reporting subscriber failures to `sink`.
    pub fn with_sink(ttl: Option<Duration>, sink: Arc<dyn DiagnosticSink>) -> Self {
        AsyncCache {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                subscriptions: SubscriptionRegistry::with_sink(sink),
                ttl,
            }),
        }
    }

    /// The configured TTL, `None` when entries never expire.
    pub fn ttl(&self) -> Option<Duration> {
        self.inner.ttl
    }

    /// Check whether the key needs a refresh.
    ///
    /// True when the key has no entry, or its TTL has passed and no refresh
    /// is in flight.
    pub fn is_expired(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .entries
            .lock()
            .get(key)
            .is_none_or(|entry| entry.is_expired(now))
    }

    /// Return the cached value.
    ///
    /// Resolves immediately with the current value (`None` for a key that was
    /// never set) unless the key is refreshing. A refreshing key suspends the
    /// caller until the next `set` or `flush` on it.
    pub async fn get(&self, key: &str) -> Result<Option<V>, CacheError> {
        let waiter = match self.lookup(key) {
            Lookup::Ready(value) => return Ok(value),
            Lookup::Pending(waiter) => waiter,
        };

        match waiter.await {
            Ok(result) => result,
            Err(_) => Err(CacheError::abandoned(key)),
        }
    }

    /// Like [`get`](AsyncCache::get), but gives up after `timeout`.
    ///
    /// A timed-out reader is pruned from the key's waiters the next time they
    /// are registered to or counted.
    pub async fn get_with_timeout(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<V>, CacheError> {
        match tokio::time::timeout(timeout, self.get(key)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(%key, ?timeout, "read timed out waiting for refresh");
                Err(CacheError::timeout(key, timeout))
            }
        }
    }

    /// Set the value, then resolve every reader waiting on the key.
    ///
    /// Overwrites any previous entry, restarts its TTL and ends the refresh.
    pub fn set(&self, key: &str, value: V) {
        let pending = {
            let mut entries = self.inner.entries.lock();
            let expire_at = Expiration::after(Instant::now(), self.inner.ttl);
            entries.insert(key.to_string(), Entry::new(value.clone(), expire_at));
            self.inner.subscriptions.take(key)
        };

        let released = pending.deliver(Notification::Value(Some(value)));
        tracing::debug!(%key, released, "cache entry set");
    }

    /// Mark the key as being recomputed.
    ///
    /// Creates an empty entry if the key is absent. The stored value and
    /// expiration are kept; readers start waiting for the next `set`.
    pub fn refresh(&self, key: &str) {
        let mut entries = self.inner.entries.lock();
        entries.entry(key.to_string()).or_default().is_refreshing = true;
        tracing::debug!(%key, "cache entry refreshing");
    }

    /// Remove the key and reject every reader waiting on it with
    /// [`CacheError::RecordFlushed`].
    pub fn flush(&self, key: &str) {
        let (removed, pending) = {
            let mut entries = self.inner.entries.lock();
            let removed = entries.remove(key).is_some();
            (removed, self.inner.subscriptions.take(key))
        };

        let rejected = pending.deliver(Notification::Error(CacheError::RecordFlushed));
        tracing::debug!(%key, removed, rejected, "cache entry flushed");
    }

    /// Whether a refresh is in flight for the key.
    pub fn is_refreshing(&self, key: &str) -> bool {
        self.inner
            .entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.is_refreshing)
    }

    /// Whether the key has an entry, refreshing or not.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of readers registered on the key and not yet notified.
    pub fn pending(&self, key: &str) -> usize {
        self.inner.subscriptions.subscriber_count(key)
    }

    fn lookup(&self, key: &str) -> Lookup<V> {
        let entries = self.inner.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_refreshing => {
                let (subscriber, waiter) = Subscriber::channel(key);
                self.inner.subscriptions.add_subscriber(key, subscriber);
                Lookup::Pending(waiter)
            }
            Some(entry) => Lookup::Ready(entry.value.clone()),
            None => Lookup::Ready(None),
        }
    }
}
