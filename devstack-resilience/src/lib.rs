//! Resilience patterns for the devstack provisioner
//!
//! This crate provides backoff strategies, a deadline-bounded readiness
//! poller and the wiring between process signals and run cancellation.

pub mod backoff;
pub mod cancel;
pub mod poller;

// Re-export commonly used types
pub use backoff::{BackoffCalculator, BackoffStrategy};
pub use cancel::{cancel_on_signal, shutdown_signal};
pub use poller::{PollAttempt, PollOutcome, PollPolicy, Poller};

// Cancellation token used across the workspace
pub use tokio_util::sync::CancellationToken;
