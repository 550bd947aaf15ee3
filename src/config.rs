use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TTL applied when none is configured, in milliseconds.
///
/// Entries go stale almost immediately, so the scheduler ends up refreshing on
/// every read cycle unless it asks for a longer TTL.
pub const DEFAULT_TTL_MS: u64 = 1;

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time in milliseconds before an entry becomes expired.
    /// `None` disables expiration.
    pub ttl_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: Some(DEFAULT_TTL_MS),
        }
    }
}

impl CacheConfig {
    /// Configuration with the given TTL in milliseconds.
    pub fn with_ttl_ms(ttl_ms: u64) -> Self {
        Self {
            ttl_ms: Some(ttl_ms),
        }
    }

    /// Configuration whose entries never expire.
    pub fn never_expires() -> Self {
        Self { ttl_ms: None }
    }

    /// The TTL as a `Duration`, `None` when expiration is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Some(Duration::from_millis(DEFAULT_TTL_MS)));
    }

    #[test]
    fn test_deserialize_ttl() {
        let config: CacheConfig = serde_json::from_str(r#"{"ttl_ms": 600}"#).unwrap();
        assert_eq!(config, CacheConfig::with_ttl_ms(600));
        assert_eq!(config.ttl(), Some(Duration::from_millis(600)));
    }

    #[test]
    fn test_deserialize_null_ttl_never_expires() {
        let config: CacheConfig = serde_json::from_str(r#"{"ttl_ms": null}"#).unwrap();
        assert_eq!(config, CacheConfig::never_expires());
        assert_eq!(config.ttl(), None);
    }

    #[test]
    fn test_deserialize_missing_fields_uses_default() {
        let config: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CacheConfig::default());
    }
}
