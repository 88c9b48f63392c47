//! Exponential reconnect backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;

/// Delay schedule for successive reconnect attempts.
///
/// Each call to [`Backoff::next_delay`] returns the current delay plus a
/// random jitter of up to `jitter * delay`, capped at `max`, then grows the
/// base delay by `factor`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
    current: Duration,
    attempt: u32,
}

impl Backoff {
    /// Create a schedule. A zero `initial` delay is raised to one millisecond.
    pub fn new(initial: Duration, max: Duration, factor: f64, jitter: f64) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Backoff {
            initial,
            max,
            factor: factor.max(1.0),
            jitter: jitter.clamp(0.0, 1.0),
            current: initial,
            attempt: 0,
        }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current.min(self.max);
        let spread = (base.as_millis() as f64 * self.jitter) as u64;
        let delay = (base + Duration::from_millis(random_below(spread))).min(self.max);

        self.current = Duration::from_millis((base.as_millis() as f64 * self.factor) as u64)
            .min(self.max);
        self.attempt += 1;
        delay
    }

    /// Start over from the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::from(&BackoffConfig::default())
    }
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        Backoff::new(
            Duration::from_millis(config.initial_ms),
            Duration::from_secs(config.max_secs),
            config.factor,
            config.jitter,
        )
    }
}

/// Random value in `0..max`, or zero when `max` is zero.
fn random_below(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..max)
}
