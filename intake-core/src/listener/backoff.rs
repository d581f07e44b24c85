//! Exponential backoff schedule for the `Reconnecting -> Connecting` edge.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
    /// Cooldown applied once `attempt` exceeds `max_retries`, before
    /// `attempt` resets and the listener re-enters `Connecting`.
    pub max_retry_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(5 * 60),
            max_retries: 5,
            max_retry_delay: Duration::from_secs(30 * 60),
        }
    }
}

/// `min(initialDelay * 1.5^(attempt-1), maxDelay)`, `attempt` 1-indexed.
pub fn delay_for_attempt(config: &BackoffConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let scaled = config.initial_delay.as_secs_f64() * 1.5f64.powi(exponent);
    Duration::from_secs_f64(scaled).min(config.max_delay)
}

/// Delay schedule for the in-session fetch-batch retry wrapper: 1s base,
/// exponential, ±25% jitter. `attempt` 1-indexed. Distinct from
/// [`delay_for_attempt`], which governs the outer `Reconnecting ->
/// Connecting` edge rather than a single batch retry.
pub fn batch_retry_delay(attempt: u32) -> Duration {
    use rand::Rng;

    let exponent = attempt.saturating_sub(1) as i32;
    let base_ms = 1000f64 * 2f64.powi(exponent);
    let capped = base_ms.min(10_000.0);
    let spread = (capped * 0.25).max(1.0);
    let lower = (capped - spread).max(0.0);
    let upper = capped + spread;
    let jittered = rand::rng().random_range(lower..=upper);
    Duration::from_secs_f64(jittered / 1000.0)
}
