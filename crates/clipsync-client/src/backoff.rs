//! Reconnect scheduling.
//!
//! The schedule is pure state: it hands out delays and counts
//! attempts, it never sleeps. The connection driver owns the timer, so
//! tests can walk the whole sequence without waiting.

use std::time::Duration;

use clipsync_shared::constants::{
    RECONNECT_CAP_SECS, RECONNECT_INITIAL_SECS, RECONNECT_MAX_ATTEMPTS,
};

/// Bounded exponential backoff parameters.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(RECONNECT_INITIAL_SECS),
            cap: Duration::from_secs(RECONNECT_CAP_SECS),
            max_attempts: RECONNECT_MAX_ATTEMPTS,
        }
    }
}

/// Mutable schedule driven by the connection loop.
#[derive(Debug, Clone)]
pub struct ReconnectSchedule {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl ReconnectSchedule {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay before the next attempt, or `None` once the attempt
    /// ceiling is reached. Each call counts as one attempt.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        let delay = self
            .policy
            .initial
            .saturating_mul(1u32 << self.attempt.min(30))
            .min(self.policy.cap);
        self.attempt += 1;
        Some(delay)
    }

    /// A successful connection clears the attempt counter, so the next
    /// failure starts over at the initial delay.
    pub fn record_success(&mut self) {
        self.attempt = 0;
    }

    /// Attempts consumed since the last success.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubling_capped_sequence() {
        let mut schedule = ReconnectSchedule::new(ReconnectPolicy::default());
        let secs: Vec<u64> = std::iter::from_fn(|| schedule.next_delay())
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 10, 10, 10, 10, 10, 10]);
        // Ceiling reached, the schedule gives up.
        assert_eq!(schedule.next_delay(), None);
    }

    #[test]
    fn test_success_resets_counter() {
        let mut schedule = ReconnectSchedule::new(ReconnectPolicy::default());
        schedule.next_delay();
        schedule.next_delay();
        schedule.next_delay();
        assert_eq!(schedule.attempts(), 3);

        schedule.record_success();
        assert_eq!(schedule.attempts(), 0);
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_custom_policy() {
        let mut schedule = ReconnectSchedule::new(ReconnectPolicy {
            initial: Duration::from_millis(100),
            cap: Duration::from_millis(250),
            max_attempts: 3,
        });
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(schedule.next_delay(), None);
    }
}
