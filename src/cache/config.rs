//! Cache tuning knobs.

use std::time::Duration;

/// Configuration for one named cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries.
    pub max_capacity: u64,

    /// Hard expiry measured from the last write.
    pub ttl: Option<Duration>,

    /// Sliding expiry measured from the last access; reading an entry
    /// resets its clock.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: None,
            tti: Some(Duration::from_secs(600)), // 10 minute sliding window
        }
    }
}

impl CacheConfig {
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set the hard time-to-live.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Set the sliding time-to-idle.
    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = Some(duration);
        self
    }
}
