//! Readiness probing configuration

use devstack_resilience::{BackoffStrategy, PollPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_duration, Validatable};

/// Readiness probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Delay before the second attempt (first one is immediate)
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,

    /// Upper bound on the delay between attempts
    #[serde(with = "humantime_serde", default = "default_max_interval")]
    pub max_interval: Duration,

    /// Total time budget for a probe step
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// How the delay evolves between attempts
    #[serde(default = "default_backoff")]
    pub backoff: BackoffStrategy,

    /// Whether to add jitter to delays
    #[serde(default)]
    pub jitter: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_interval: default_max_interval(),
            timeout: default_timeout(),
            backoff: default_backoff(),
            jitter: false,
        }
    }
}

impl ReadinessConfig {
    /// Polling policy, optionally with a step-specific timeout
    pub fn poll_policy(&self, timeout_override: Option<Duration>) -> PollPolicy {
        PollPolicy {
            initial_interval: self.interval,
            max_interval: self.max_interval,
            timeout: timeout_override.unwrap_or(self.timeout),
            backoff_strategy: self.backoff.clone(),
            jitter: self.jitter,
        }
    }
}

impl Validatable for ReadinessConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_duration(self.interval, "interval", self.domain_name())?;
        validate_duration(self.timeout, "timeout", self.domain_name())?;

        if self.max_interval < self.interval {
            return Err(self.validation_error(format!(
                "max_interval ({:?}) must not be smaller than interval ({:?})",
                self.max_interval, self.interval
            )));
        }

        if let BackoffStrategy::Exponential { base } = self.backoff {
            if base < 1.0 {
                return Err(self.validation_error(format!(
                    "exponential backoff base must be at least 1.0, got {}",
                    base
                )));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "readiness"
    }
}

// Default value functions
fn default_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff() -> BackoffStrategy {
    BackoffStrategy::Exponential { base: 2.0 }
}
