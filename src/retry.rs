use std::time::Duration;

/// Bounded retry settings for one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; always at least 1.
    pub max_attempts: u32,
    /// Pause before every retry.
    pub delay: Duration,
    /// Extra pause after a failure that is not a plain connection hiccup.
    pub error_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, error_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            error_delay,
        }
    }

    /// No pauses at all; handy in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Whether `attempt` (1-based) may be followed by another one.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// How long to wait before the next attempt.
    pub fn wait_for(&self, after_error: bool) -> Duration {
        if after_error {
            self.delay + self.error_delay
        } else {
            self.delay
        }
    }

    pub fn pause(&self, after_error: bool) {
        let wait = self.wait_for(after_error);
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_one_attempt() {
        let p = RetryPolicy::immediate(0);
        assert_eq!(p.max_attempts, 1);
        assert!(!p.allows_retry_after(1));
    }

    #[test]
    fn counts_attempts() {
        let p = RetryPolicy::immediate(3);
        assert!(p.allows_retry_after(1));
        assert!(p.allows_retry_after(2));
        assert!(!p.allows_retry_after(3));
    }

    #[test]
    fn error_delay_adds_to_the_base_delay() {
        let p = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(p.wait_for(false), Duration::from_secs(1));
        assert_eq!(p.wait_for(true), Duration::from_secs(6));
    }
}
