//! Devstack provisioning pipeline
//!
//! The building blocks of a provisioning run:
//! - [`ReadinessProber`] waits for a datastore to answer its health query
//! - [`SeedLoader`] applies user scripts and data dumps to a datastore
//! - [`MigrationRunner`] migrates logical databases one at a time
//! - [`ServiceActivator`] starts a dependent service detached
//! - [`BootstrapSequencer`] runs the steps in order and stops at the first failure
//!
//! Steps are built from the configured pipeline by [`plan::build_plan`].

pub mod activate;
pub mod context;
pub mod migrate;
pub mod plan;
pub mod probe;
pub mod reporter;
pub mod seed;
pub mod sequencer;
pub mod step;

pub use activate::ServiceActivator;
pub use context::RunContext;
pub use migrate::MigrationRunner;
pub use plan::{build_plan, describe_plan, Collaborators, PlanEntry};
pub use probe::ReadinessProber;
pub use reporter::{ConsoleReporter, ProgressEvent, ProgressReporter, RecordingReporter, TracingReporter};
pub use seed::{non_idempotent_statements, IdempotencyViolation, SeedLoader};
pub use sequencer::{BootstrapSequencer, RunResult};
pub use step::Step;
