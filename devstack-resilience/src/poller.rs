//! Deadline-bounded polling of a health predicate
//!
//! The poller invokes a check repeatedly until it succeeds, the time budget
//! runs out or the run is cancelled. The first attempt is made immediately.
//! A further attempt is only scheduled when it would start before the
//! deadline, so with a fixed interval a check that never succeeds is tried
//! exactly `ceil(timeout / interval)` times.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::backoff::{BackoffCalculator, BackoffStrategy};

/// Polling policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay after the first failed attempt
    #[serde(with = "humantime_serde")]
    pub initial_interval: Duration,

    /// Maximum delay between attempts
    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,

    /// Total time budget, measured from the first attempt
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Backoff strategy
    pub backoff_strategy: BackoffStrategy,

    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            backoff_strategy: BackoffStrategy::default(),
            jitter: false,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            timeout,
            backoff_strategy: BackoffStrategy::Fixed,
            jitter: false,
        }
    }

    fn calculator(&self) -> BackoffCalculator {
        BackoffCalculator::new(
            self.backoff_strategy.clone(),
            self.initial_interval,
            self.max_interval,
            self.jitter,
        )
    }
}

/// Terminal result of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The check succeeded on attempt `attempts`
    Ready { attempts: u32 },
    /// The time budget ran out
    TimedOut { attempts: u32, elapsed: Duration },
    /// The cancellation token fired
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts }
            | PollOutcome::TimedOut { attempts, .. }
            | PollOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

/// Progress of a single attempt, handed to the observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAttempt {
    /// 1-indexed attempt number
    pub attempt: u32,
    /// Time since the first attempt started
    pub elapsed: Duration,
    /// Why the check did not succeed, if it did not
    pub error: Option<String>,
}

impl PollAttempt {
    pub fn is_ready(&self) -> bool {
        self.error.is_none()
    }
}

/// Readiness poller
pub struct Poller {
    policy: PollPolicy,
    calculator: BackoffCalculator,
    cancel: CancellationToken,
}

impl Poller {
    /// Create a new poller with the given policy and cancellation token
    pub fn new(policy: PollPolicy, cancel: CancellationToken) -> Self {
        let calculator = policy.calculator();
        Self {
            policy,
            calculator,
            cancel,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `check` until it succeeds, times out or is cancelled
    pub async fn poll<F, Fut, E>(&self, check: F) -> PollOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        self.poll_with_observer(check, |_| {}).await
    }

    /// Poll `check`, reporting every finished attempt to `observer`
    ///
    /// A check that returns an error counts as a failed attempt. A check
    /// still running when the deadline passes is abandoned and the attempt
    /// is counted.
    pub async fn poll_with_observer<F, Fut, E, O>(&self, mut check: F, mut observer: O) -> PollOutcome
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
        O: FnMut(&PollAttempt),
    {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!("Polling cancelled after {} attempts", attempt);
                return PollOutcome::Cancelled { attempts: attempt };
            }

            attempt += 1;
            debug!("Readiness attempt {}", attempt);

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Polling cancelled during attempt {}", attempt);
                    return PollOutcome::Cancelled { attempts: attempt };
                }
                _ = sleep_until(deadline) => {
                    let elapsed = started.elapsed();
                    warn!("Attempt {} still running at the deadline after {:?}", attempt, elapsed);
                    observer(&PollAttempt {
                        attempt,
                        elapsed,
                        error: Some("deadline reached during attempt".to_string()),
                    });
                    return PollOutcome::TimedOut { attempts: attempt, elapsed };
                }
                result = check(attempt) => result,
            };

            let elapsed = started.elapsed();
            match result {
                Ok(()) => {
                    observer(&PollAttempt {
                        attempt,
                        elapsed,
                        error: None,
                    });
                    if attempt > 1 {
                        info!("Ready after {} attempts ({:?})", attempt, elapsed);
                    }
                    return PollOutcome::Ready { attempts: attempt };
                }
                Err(error) => {
                    let error = error.to_string();
                    debug!("Attempt {} not ready: {}", attempt, error);
                    observer(&PollAttempt {
                        attempt,
                        elapsed,
                        error: Some(error),
                    });
                }
            }

            let delay = self.calculator.calculate_delay(attempt);
            if Instant::now() + delay >= deadline {
                let elapsed = started.elapsed();
                warn!("Not ready after {} attempts in {:?}", attempt, elapsed);
                return PollOutcome::TimedOut { attempts: attempt, elapsed };
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Polling cancelled while waiting after attempt {}", attempt);
                    return PollOutcome::Cancelled { attempts: attempt };
                }
                _ = sleep(delay) => {}
            }
        }
    }
}
