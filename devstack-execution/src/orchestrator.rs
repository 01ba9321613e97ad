//! Process orchestrator abstraction

use async_trait::async_trait;
use devstack_core::{ExitStatus, ServiceDescriptor};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{ExecutionError, ExecutionResult};

/// Where a command's standard input comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StdinSource {
    #[default]
    Null,
    Bytes(Vec<u8>),
    /// Streamed from a file on the host
    File(PathBuf),
}

/// A command to run inside a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub service: String,
    pub argv: Vec<String>,
    /// Environment set inside the service for this command only
    pub env: BTreeMap<String, String>,
    pub stdin: StdinSource,
}

impl ExecRequest {
    pub fn new(service: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            service: service.into(),
            argv,
            env: BTreeMap::new(),
            stdin: StdinSource::Null,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_stdin_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = StdinSource::Bytes(bytes.into());
        self
    }

    pub fn with_stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = StdinSource::File(path.into());
        self
    }

    /// Command line for logs and error messages
    pub fn display_command(&self) -> String {
        self.argv.join(" ")
    }
}

/// Exit status and captured output of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            status: ExitStatus(Some(0)),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: ExitStatus(Some(code)),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Turn a non-zero exit into `ExecutionError::CommandFailed`
    pub fn check(self, service: &str, command: impl Into<String>) -> ExecutionResult<Self> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(ExecutionError::CommandFailed {
                service: service.to_string(),
                command: command.into(),
                status: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs commands inside services and starts services
///
/// Implementations carry their own working directory and environment; they
/// never depend on the caller's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessOrchestrator: Send + Sync {
    /// Run a command inside a running service and wait for it to exit
    async fn exec(&self, request: ExecRequest) -> ExecutionResult<CommandOutput>;

    /// Ask for a service to be started detached; returns once the request
    /// is acknowledged
    async fn start_detached(&self, service: &ServiceDescriptor) -> ExecutionResult<CommandOutput>;
}
