use std::time::Duration;

/// Backoff schedule for retrying temporary failures.
///
/// The delay starts at `initial`, grows by `multiplier` on each consecutive
/// failure, and stops growing after `max_growth` steps. Items are never
/// dropped for temporary failures, so the cap bounds the per-attempt delay
/// rather than the number of attempts.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    initial: Duration,
    multiplier: f64,
    max_growth: u32,
    attempt: u32,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, multiplier: f64, max_growth: u32) -> Self {
        Self {
            initial,
            multiplier,
            max_growth,
            attempt: 0,
        }
    }

    /// Constant delay between retries.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, 1.0, 0)
    }

    /// Schedule used by the events service: 1.7s doubling, capped after
    /// 7 doublings (~3.6 minutes per attempt at the cap).
    pub fn events() -> Self {
        Self::new(Duration::from_millis(1700), 2.0, 7)
    }

    /// Computes the delay for the given failure attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped = attempt.min(self.max_growth);
        let factor = self.multiplier.powi(capped as i32);
        Duration::from_secs_f64(self.initial.as_secs_f64() * factor)
    }

    /// Returns the delay for the current attempt and advances the counter.
    pub fn next(&mut self) -> Duration {
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Resets to the initial delay; called after any success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of consecutive failures recorded since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
