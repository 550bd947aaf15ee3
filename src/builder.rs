//! Builder API for creating cache instances.
//!
//! This module provides a convenient way to configure the TTL and the
//! diagnostic sink of a cache before building it.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::AsyncCache;
use crate::config::CacheConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};

/// Builder for creating cache instances.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use async_cache::{AsyncCache, CacheBuilder};
///
/// let cache: AsyncCache<String> = CacheBuilder::new()
///     .ttl(Duration::from_secs(60))
///     .build();
///
/// assert_eq!(cache.ttl(), Some(Duration::from_secs(60)));
/// ```
pub struct CacheBuilder {
    ttl: Option<Duration>,
    sink: Arc<dyn DiagnosticSink>,
}

impl CacheBuilder {
    /// Create a new CacheBuilder with the default configuration.
    pub fn new() -> Self {
        Self::from_config(&CacheConfig::default())
    }

    /// Create a CacheBuilder seeded from a configuration value.
    pub fn from_config(config: &CacheConfig) -> Self {
        CacheBuilder {
            ttl: config.ttl(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Expire entries `ttl` after they are set.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Expire entries `ttl_ms` milliseconds after they are set.
    pub fn ttl_ms(self, ttl_ms: u64) -> Self {
        self.ttl(Duration::from_millis(ttl_ms))
    }

    /// Never expire entries.
    pub fn never_expire(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Report subscriber failures to `sink` instead of logging them.
    pub fn diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the cache.
    pub fn build<V>(self) -> AsyncCache<V>
    where
        V: Clone + Send + 'static,
    {
        AsyncCache::with_sink(self.ttl, self.sink)
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
