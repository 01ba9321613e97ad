//! Core domain models and types for the devstack provisioner
//!
//! This crate defines the vocabulary shared by every other crate in the
//! workspace: datastore targets, seed artifacts, logical databases, the
//! run state machine and the provisioning error taxonomy. It has minimal
//! dependencies and performs no I/O.

pub mod error;
pub mod run;
pub mod types;

// Re-export commonly used types at the crate root
pub use error::{BoxError, ExitStatus, ProvisionError, Result};
pub use run::{RunId, RunOutcome, RunReport, RunState, StepKind, StepRecord, StepStatus};
pub use types::{DatastoreKind, DatastoreTarget, LogicalDatabase, ParseError, SeedArtifact, ServiceDescriptor};
