//! Error types for command execution

use devstack_core::ExitStatus;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Command execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` in service '{service}' failed with {status}{}", stderr_suffix(.stderr))]
    CommandFailed {
        service: String,
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` in service '{service}' did not finish within {timeout:?}")]
    Timeout {
        service: String,
        command: String,
        timeout: Duration,
    },

    #[error("Artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },
}

impl ExecutionError {
    /// Exit status of the failed command; absent when it never exited
    /// normally
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ExecutionError::CommandFailed { status, .. } => *status,
            _ => ExitStatus(None),
        }
    }

    /// Captured stderr of the failed command, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExecutionError::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => Some(stderr.trim()),
            _ => None,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.trim().lines().last() {
        Some(line) if !line.is_empty() => format!(": {}", line),
        _ => String::new(),
    }
}

/// Result alias for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;
