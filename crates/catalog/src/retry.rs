use std::time::Duration;

/// Bounded retry with a fixed or growing pause between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Pause after the first failed attempt.
    pub wait: Duration,
    /// Growth factor of the pause per further attempt; 1.0 keeps it fixed.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Creates a policy with a fixed pause.
    pub fn fixed(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
            multiplier: 1.0,
        }
    }

    /// Creates a policy whose pause is multiplied after each attempt.
    pub fn exponential(max_attempts: u32, wait: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
            multiplier: multiplier.max(1.0),
        }
    }

    /// Returns true if another attempt is allowed after `attempt` failed.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Pause before the attempt that follows failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.wait.mul_f64(self.multiplier.powi(exponent))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}
