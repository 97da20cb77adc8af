//! Connection and retry settings

use hookscribe_config::DatabaseSettings;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bounded exponential backoff for busy/locked errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub base_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Cap on the sum of all delays
    pub max_total_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DatabaseSettings::at(PathBuf::new()))
    }
}

impl From<&DatabaseSettings> for RetryPolicy {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            max_total_delay: Duration::from_millis(settings.max_total_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Nominal delay after `failures` failed attempts, before jitter
    pub fn nominal_delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(20);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(1u64 << exp);
        Duration::from_millis(millis).min(self.max_delay)
    }

    /// Delay after `failures` failed attempts with ±25% jitter, still capped
    pub fn jittered_delay(&self, failures: u32) -> Duration {
        let base_ms = self.nominal_delay(failures).as_millis() as u64;
        let jitter_range = base_ms / 4;
        let jitter = if jitter_range > 0 {
            rand::random::<u64>() % (jitter_range * 2 + 1)
        } else {
            0
        };
        let millis = base_ms.saturating_sub(jitter_range) + jitter;
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Everything needed to open the event database
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Database file path (`:memory:` for tests)
    pub path: PathBuf,
    /// `busy_timeout` applied to every connection
    pub busy_timeout: Duration,
    /// `cache_size` pragma; negative values are KiB
    pub cache_size: i64,
    /// `mmap_size` pragma in bytes
    pub mmap_size: i64,
    pub retry: RetryPolicy,
}

impl WriterConfig {
    pub const DEFAULT_CACHE_SIZE: i64 = -64_000;
    pub const DEFAULT_MMAP_SIZE: i64 = 268_435_456;

    /// Defaults for a database at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from(&DatabaseSettings::at(path.as_ref()))
    }

    /// In-memory database; only useful within a single connection
    pub fn memory() -> Self {
        Self::new(":memory:")
    }

    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl From<&DatabaseSettings> for WriterConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            path: settings.path.clone(),
            busy_timeout: settings.busy_timeout(),
            cache_size: Self::DEFAULT_CACHE_SIZE,
            mmap_size: Self::DEFAULT_MMAP_SIZE,
            retry: RetryPolicy::from(settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WriterConfig::new("/tmp/x.db");
        assert_eq!(config.busy_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.retry.base_delay, Duration::from_millis(25));
        assert_eq!(config.retry.max_total_delay, Duration::from_secs(5));
        assert!(!config.is_memory());
        assert!(WriterConfig::memory().is_memory());
    }

    #[test]
    fn test_nominal_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.nominal_delay(1), Duration::from_millis(25));
        assert_eq!(policy.nominal_delay(2), Duration::from_millis(50));
        assert_eq!(policy.nominal_delay(3), Duration::from_millis(100));
        assert_eq!(policy.nominal_delay(7), Duration::from_millis(1000));
        assert_eq!(policy.nominal_delay(30), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let delay = policy.jittered_delay(3).as_millis();
            assert!((75..=125).contains(&delay), "{delay}");
        }
        for _ in 0..200 {
            assert!(policy.jittered_delay(10) <= policy.max_delay);
        }
    }
}
