use std::time::Duration;

use crate::config::SyncConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap: cap.max(base),
            max_attempts,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.max_attempts,
        )
    }

    /// Delay before reconnect attempt `attempt` (1-based): the base delay
    /// doubled per earlier attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << doublings)
            .unwrap_or(self.cap)
            .min(self.cap)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_cap() {
        let backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(5), 10);
        let delays = (1..=6).map(|n| backoff.delay_for(n)).collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1_000),
                Duration::from_millis(2_000),
                Duration::from_millis(4_000),
                Duration::from_millis(5_000),
                Duration::from_millis(5_000),
            ]
        );
    }

    #[test]
    fn huge_attempt_counts_saturate_at_cap() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30), 3);
        assert_eq!(backoff.delay_for(500), Duration::from_secs(30));
        assert!(backoff.allows(3));
        assert!(!backoff.allows(4));
    }
}
