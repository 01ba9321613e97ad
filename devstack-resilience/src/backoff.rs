//! Backoff strategies for polling delays

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay between two attempts evolves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay before every attempt
    Fixed,

    /// Linear increase: delay = initial_delay * attempt
    Linear,

    /// Exponential increase: delay = initial_delay * base^(attempt-1)
    Exponential {
        /// Base for exponential calculation (e.g., 2.0 for doubling)
        base: f64,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential { base: 2.0 }
    }
}

/// Backoff delay calculator
#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    strategy: BackoffStrategy,
    initial_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl BackoffCalculator {
    /// Create a new backoff calculator
    pub fn new(strategy: BackoffStrategy, initial_delay: Duration, max_delay: Duration, jitter: bool) -> Self {
        Self {
            strategy,
            initial_delay,
            max_delay,
            jitter,
        }
    }

    /// Delay to wait after the given attempt (1-indexed), capped at the
    /// maximum delay
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let capped_delay = self.calculate_base_delay(attempt).min(self.max_delay);

        if self.jitter {
            add_jitter(capped_delay).min(self.max_delay)
        } else {
            capped_delay
        }
    }

    fn calculate_base_delay(&self, attempt: u32) -> Duration {
        match &self.strategy {
            BackoffStrategy::Fixed => self.initial_delay,

            BackoffStrategy::Linear => self.initial_delay.saturating_mul(attempt.max(1)),

            BackoffStrategy::Exponential { base } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let nanos = self.initial_delay.as_nanos() as f64 * base.powi(exponent);
                // Clamp before converting so large exponents cannot overflow
                let max_nanos = self.max_delay.as_nanos() as f64;
                Duration::from_nanos(nanos.min(max_nanos).min(u64::MAX as f64) as u64)
            }
        }
    }
}

/// Add +/-20% jitter
fn add_jitter(delay: Duration) -> Duration {
    let jitter_factor = rand::thread_rng().gen_range(0.8..1.2);
    Duration::from_nanos((delay.as_nanos() as f64 * jitter_factor) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Fixed,
            Duration::from_millis(100),
            Duration::from_secs(1),
            false,
        );

        assert_eq!(calc.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(calc.calculate_delay(2), Duration::from_millis(100));
        assert_eq!(calc.calculate_delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_linear_backoff() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Linear,
            Duration::from_millis(100),
            Duration::from_secs(1),
            false,
        );

        assert_eq!(calc.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(calc.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(calc.calculate_delay(5), Duration::from_millis(500));
        assert_eq!(calc.calculate_delay(20), Duration::from_secs(1)); // Capped at max
    }

    #[test]
    fn test_default_readiness_schedule() {
        // 1s initial, doubling, 5s cap
        let calc = BackoffCalculator::new(
            BackoffStrategy::default(),
            Duration::from_secs(1),
            Duration::from_secs(5),
            false,
        );

        let delays: Vec<u64> = (1..=5).map(|a| calc.calculate_delay(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn test_exponential_does_not_overflow() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Exponential { base: 10.0 },
            Duration::from_secs(1),
            Duration::from_secs(30),
            false,
        );

        assert_eq!(calc.calculate_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_cap() {
        let calc = BackoffCalculator::new(
            BackoffStrategy::Fixed,
            Duration::from_millis(1000),
            Duration::from_millis(1100),
            true,
        );

        for _ in 0..20 {
            let delay = calc.calculate_delay(1);
            assert!(delay >= Duration::from_millis(800));
            assert!(delay <= Duration::from_millis(1100));
        }
    }

    #[test]
    fn test_strategy_yaml() {
        let strategy: BackoffStrategy = serde_yaml::from_str("type: exponential\nbase: 1.5\n").unwrap();
        assert_eq!(strategy, BackoffStrategy::Exponential { base: 1.5 });
        let strategy: BackoffStrategy = serde_yaml::from_str("type: linear\n").unwrap();
        assert_eq!(strategy, BackoffStrategy::Linear);
    }
}
