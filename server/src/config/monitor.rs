//! Release monitor configuration

use std::env;
use std::time::Duration;

/// Cadence settings for the automatic-release poll.
///
/// The interactive countdown ticks once per second in the UI; the
/// authoritative release check only needs to run about once a minute because
/// `release` is precondition-guarded and safe to attempt late.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Seconds between release polls.
    pub poll_interval_secs: u64,
    /// Maximum rows processed per poll tick.
    pub batch_size: i64,
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        let poll_interval_secs = env::var("RELEASE_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        let batch_size = env::var("RELEASE_POLL_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        Self {
            poll_interval_secs,
            batch_size,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            batch_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_interval_clamped() {
        let config = MonitorConfig {
            poll_interval_secs: 0,
            batch_size: 10,
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
