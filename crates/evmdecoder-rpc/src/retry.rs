//! Linear or exponential backoff retry policy.

use std::time::Duration;

/// Shape of the wait between failed attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// `min + step * attempt`, capped at `max`.
    Linear {
        min: Duration,
        step: Duration,
        max: Duration,
    },
    /// `initial * multiplier^(attempt - 1)`, capped at `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Backoff::Linear {
                min: Duration::ZERO,
                step: Duration::from_millis(2_500),
                max: Duration::from_secs(120),
            },
        }
    }
}

/// Stateless retry policy: computes the next delay given the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the delay after the `attempt`-th failed attempt (1-based).
    /// Returns `None` once `max_attempts` have been used up.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.config.max_attempts {
            return None;
        }
        let delay = match &self.config.backoff {
            Backoff::Linear { min, step, max } => {
                let ms = min.as_millis() as u64 + step.as_millis() as u64 * u64::from(attempt);
                Duration::from_millis(ms).min(*max)
            }
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let base_ms = initial.as_millis() as f64 * multiplier.powi((attempt - 1) as i32);
                let cap_ms = max.as_millis() as f64;
                Duration::from_millis(base_ms.min(cap_ms) as u64)
            }
        };
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_delays() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 4,
            backoff: Backoff::Linear {
                min: Duration::from_millis(10),
                step: Duration::from_millis(100),
                max: Duration::from_secs(1),
            },
        });
        assert_eq!(policy.next_delay(1).unwrap().as_millis(), 110);
        assert_eq!(policy.next_delay(2).unwrap().as_millis(), 210);
        assert_eq!(policy.next_delay(3).unwrap().as_millis(), 310);
        assert!(policy.next_delay(4).is_none());
    }

    #[test]
    fn exponential_delays() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 4,
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(30),
            },
        });
        assert_eq!(policy.next_delay(1).unwrap().as_millis(), 100);
        assert_eq!(policy.next_delay(2).unwrap().as_millis(), 200);
        assert_eq!(policy.next_delay(3).unwrap().as_millis(), 400);
        assert!(policy.next_delay(4).is_none());
    }

    #[test]
    fn delay_capped_at_max() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 50,
            backoff: Backoff::Linear {
                min: Duration::ZERO,
                step: Duration::from_millis(2_500),
                max: Duration::from_secs(120),
            },
        });
        assert_eq!(policy.next_delay(49).unwrap(), Duration::from_secs(120));
    }
}
