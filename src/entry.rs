use std::time::Duration;
use tokio::time::Instant;

/// When an entry stops being fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// The entry is stale from this instant on.
    At(Instant),
    /// The entry never goes stale.
    Never,
}

impl Expiration {
    /// Compute the expiration for an entry written at `now`.
    ///
    /// `None` disables expiration. A TTL too large to represent also
    /// collapses to `Never` instead of wrapping around.
    pub fn after(now: Instant, ttl: Option<Duration>) -> Self {
        match ttl.and_then(|ttl| now.checked_add(ttl)) {
            Some(at) => Expiration::At(at),
            None => Expiration::Never,
        }
    }

    /// Check if the deadline has passed.
    pub fn has_passed(&self, now: Instant) -> bool {
        match self {
            Expiration::At(at) => now > *at,
            Expiration::Never => false,
        }
    }
}

/// A cache entry containing an optional value and its freshness state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    /// The cached value. `None` until the first `set`.
    pub value: Option<V>,

    /// Before this point the entry is considered fresh.
    pub expire_at: Expiration,

    /// A recomputation is in flight; readers wait for it.
    pub is_refreshing: bool,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Entry {
            value: None,
            expire_at: Expiration::Never,
            is_refreshing: false,
        }
    }
}

impl<V> Entry<V> {
    /// Create a fresh entry holding `value`.
    pub fn new(value: V, expire_at: Expiration) -> Self {
        Entry {
            value: Some(value),
            expire_at,
            is_refreshing: false,
        }
    }

    /// Check if the entry is still fresh.
    pub fn is_fresh(&self, now: Instant) -> bool {
        !self.expire_at.has_passed(now)
    }

    /// Check if the entry has expired and should be refreshed.
    ///
    /// A refreshing entry is never expired: the refresh is already in flight.
    pub fn is_expired(&self, now: Instant) -> bool {
        !self.is_refreshing && self.expire_at.has_passed(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_after_ttl() {
        let now = Instant::now();
        let expire_at = Expiration::after(now, Some(Duration::from_millis(600)));

        assert_eq!(expire_at, Expiration::At(now + Duration::from_millis(600)));
        assert!(!expire_at.has_passed(now));
        assert!(!expire_at.has_passed(now + Duration::from_millis(600)));
        assert!(expire_at.has_passed(now + Duration::from_millis(601)));
    }

    #[test]
    fn test_expiration_never() {
        let now = Instant::now();
        let expire_at = Expiration::after(now, None);

        assert_eq!(expire_at, Expiration::Never);
        assert!(!expire_at.has_passed(now + Duration::from_secs(86_400 * 365)));
    }

    #[test]
    fn test_expiration_overflow_is_never() {
        let now = Instant::now();
        assert_eq!(Expiration::after(now, Some(Duration::MAX)), Expiration::Never);
    }

    #[test]
    fn test_refreshing_entry_is_not_expired() {
        let now = Instant::now();
        let mut entry = Entry::new(true, Expiration::At(now));
        let later = now + Duration::from_millis(1);

        assert!(entry.is_expired(later));
        assert!(!entry.is_fresh(later));

        entry.is_refreshing = true;
        assert!(!entry.is_expired(later));
    }

    #[test]
    fn test_default_entry_is_empty_and_never_expires() {
        let entry: Entry<String> = Entry::default();
        assert!(entry.value.is_none());
        assert!(!entry.is_refreshing);
        assert!(!entry.is_expired(Instant::now()));
    }
}
