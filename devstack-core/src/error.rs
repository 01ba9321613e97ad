//! Provisioning error taxonomy
//!
//! Every variant is fatal to the current run. Steps convert lower-level
//! failures (process spawn errors, non-zero exits) into one of these at
//! their boundary; the sequencer records the failing step and halts.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::{DatastoreTarget, LogicalDatabase, ServiceDescriptor};

/// Boxed underlying error carried by provisioning failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Exit status of an external command.
///
/// `None` means the process never produced an exit code: it was killed by a
/// signal or could not be spawned at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(pub Option<i32>);

impl ExitStatus {
    pub fn code(&self) -> Option<i32> {
        self.0
    }

    pub fn success(&self) -> bool {
        self.0 == Some(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit status {}", code),
            None => write!(f, "no exit status"),
        }
    }
}

/// Errors that abort a provisioning run
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The health predicate never succeeded within the budget
    #[error("{target} not ready after {attempts} attempts in {elapsed:?}")]
    ReadinessTimeout {
        target: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// A bootstrap command failed
    #[error("Seeding {target} failed: {source}")]
    SeedExecutionFailure {
        target: DatastoreTarget,
        #[source]
        source: BoxError,
    },

    /// A schema migration command failed
    #[error("Migration of logical database '{database}' failed with {exit_status}")]
    MigrationFailure {
        database: LogicalDatabase,
        exit_status: ExitStatus,
        detail: Option<String>,
    },

    /// The orchestrator rejected a service start request
    #[error("Starting service '{service}' failed: {source}")]
    ActivationFailure {
        service: ServiceDescriptor,
        #[source]
        source: BoxError,
    },

    /// External cancellation was requested
    #[error("Cancelled during {stage}")]
    Cancelled { stage: String },

    /// The configured step list cannot be turned into a runnable plan
    #[error("Invalid provisioning plan: {0}")]
    InvalidPlan(String),
}

impl ProvisionError {
    /// Build a seed failure from any error type
    pub fn seed_failure(target: DatastoreTarget, source: impl Into<BoxError>) -> Self {
        ProvisionError::SeedExecutionFailure {
            target,
            source: source.into(),
        }
    }

    /// Build an activation failure from any error type
    pub fn activation_failure(service: ServiceDescriptor, source: impl Into<BoxError>) -> Self {
        ProvisionError::ActivationFailure {
            service,
            source: source.into(),
        }
    }

    /// Whether this error stems from external cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProvisionError::Cancelled { .. })
    }

    /// Stable machine-readable code used in run reports
    pub fn error_code(&self) -> &'static str {
        match self {
            ProvisionError::ReadinessTimeout { .. } => "READINESS_TIMEOUT",
            ProvisionError::SeedExecutionFailure { .. } => "SEED_EXECUTION_FAILURE",
            ProvisionError::MigrationFailure { .. } => "MIGRATION_FAILURE",
            ProvisionError::ActivationFailure { .. } => "ACTIVATION_FAILURE",
            ProvisionError::Cancelled { .. } => "CANCELLED",
            ProvisionError::InvalidPlan(_) => "INVALID_PLAN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatastoreKind;

    #[test]
    fn test_exit_status_display() {
        assert_eq!(ExitStatus(Some(2)).to_string(), "exit status 2");
        assert_eq!(ExitStatus(None).to_string(), "no exit status");
        assert!(ExitStatus(Some(0)).success());
        assert!(!ExitStatus(None).success());
    }

    #[test]
    fn test_seed_failure_keeps_source() {
        let err = ProvisionError::seed_failure(
            DatastoreTarget::new(DatastoreKind::Relational, "mysql"),
            "access denied for user 'root'",
        );

        assert_eq!(err.error_code(), "SEED_EXECUTION_FAILURE");
        assert!(err.to_string().contains("relational datastore 'mysql'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_migration_failure_message() {
        let err = ProvisionError::MigrationFailure {
            database: LogicalDatabase::from("student_module_history"),
            exit_status: ExitStatus(Some(1)),
            detail: None,
        };

        assert_eq!(
            err.to_string(),
            "Migration of logical database 'student_module_history' failed with exit status 1"
        );
    }

    #[test]
    fn test_cancelled_detection() {
        let err = ProvisionError::Cancelled {
            stage: "wait-for-mongo".to_string(),
        };
        assert!(err.is_cancelled());
        assert_eq!(err.error_code(), "CANCELLED");
    }
}
