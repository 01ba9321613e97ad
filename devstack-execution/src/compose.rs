//! `docker compose` backed process orchestrator

use async_trait::async_trait;
use devstack_config::OrchestratorConfig;
use devstack_core::{ExitStatus, ServiceDescriptor};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

use crate::error::{ExecutionError, ExecutionResult};
use crate::orchestrator::{CommandOutput, ExecRequest, ProcessOrchestrator, StdinSource};

/// Maximum stdout or stderr size captured per stream (10 MiB)
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Orchestrator that shells out to `docker compose` (or a compatible CLI)
pub struct ComposeOrchestrator {
    config: OrchestratorConfig,
}

impl ComposeOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Arguments shared by every request: base args, compose files, project
    fn compose_args(&self) -> Vec<String> {
        let mut args = self.config.base_args.clone();
        for file in &self.config.compose_files {
            args.push("-f".to_string());
            args.push(self.config.resolve(file).to_string_lossy().into_owned());
        }
        if let Some(ref project) = self.config.project_name {
            args.push("-p".to_string());
            args.push(project.clone());
        }
        args
    }

    /// Full argument list for running `request` inside its service
    ///
    /// Only the names of per-command variables appear here; `docker compose
    /// exec -e NAME` takes the value from the environment the CLI runs with,
    /// so secrets never reach the process table.
    pub fn exec_args(&self, request: &ExecRequest) -> Vec<String> {
        let mut args = self.compose_args();
        args.push("exec".to_string());
        args.push("-T".to_string());
        for key in request.env.keys() {
            args.push("-e".to_string());
            args.push(key.clone());
        }
        args.push(request.service.clone());
        args.extend(request.argv.iter().cloned());
        args
    }

    /// Full argument list for starting `service` detached
    pub fn up_args(&self, service: &ServiceDescriptor) -> Vec<String> {
        let mut args = self.compose_args();
        args.push("up".to_string());
        args.push("-d".to_string());
        args.push(service.name.clone());
        args
    }

    fn command(&self, args: &[String], env: &BTreeMap<String, String>) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(args).current_dir(&self.config.project_dir).kill_on_drop(true);

        if !self.config.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(&self.config.env);
        cmd.envs(env);
        cmd
    }

    async fn run(
        &self,
        service: &str,
        command_line: String,
        args: Vec<String>,
        env: &BTreeMap<String, String>,
        stdin: &StdinSource,
    ) -> ExecutionResult<CommandOutput> {
        let program = self.config.program.clone();

        // Open the input before spawning so a missing artifact never starts a command
        let input = match stdin {
            StdinSource::Null => None,
            StdinSource::Bytes(bytes) => Some(Input::Bytes(bytes.clone())),
            StdinSource::File(path) => match tokio::fs::File::open(path).await {
                Ok(file) => Some(Input::File(file)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(ExecutionError::ArtifactNotFound { path: path.clone() });
                }
                Err(e) => return Err(ExecutionError::Io { program, source: e }),
            },
        };

        let mut cmd = self.command(&args, env);
        cmd.stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %program, args = ?args, "Spawning orchestrator command");
        let start = Instant::now();

        let mut child = cmd.spawn().map_err(|e| ExecutionError::Spawn {
            program: program.clone(),
            source: e,
        })?;

        // Drain output and feed input concurrently so large inputs cannot
        // deadlock on full pipes, and a client that never reads its input
        // still falls under the command timeout
        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));
        let writer = match (child.stdin.take(), input) {
            (Some(child_stdin), Some(input)) => Some(tokio::spawn(write_input(child_stdin, input))),
            _ => None,
        };

        let waited = match self.config.command_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status,
                Err(_elapsed) => {
                    if let Some(ref writer) = writer {
                        writer.abort();
                    }
                    // Dropping the child kills it
                    warn!(service, command = %command_line, ?timeout, "Orchestrator command timed out");
                    return Err(ExecutionError::Timeout {
                        service: service.to_string(),
                        command: command_line,
                        timeout,
                    });
                }
            },
            None => child.wait().await,
        };
        let status = waited.map_err(|e| ExecutionError::Io {
            program: program.clone(),
            source: e,
        })?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(ExecutionError::Io { program, source: e });
                }
                // The command may exit before reading all of its input
                Ok(Err(_)) => debug!("Command closed stdin early"),
                _ => {}
            }
        }

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        debug!(
            service,
            command = %command_line,
            exit_code = ?status.code(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Orchestrator command finished"
        );

        Ok(CommandOutput {
            status: ExitStatus(status.code()),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// Standard input resolved before the command is spawned
enum Input {
    Bytes(Vec<u8>),
    File(tokio::fs::File),
}

async fn write_input(mut child_stdin: ChildStdin, input: Input) -> std::io::Result<()> {
    match input {
        Input::Bytes(bytes) => child_stdin.write_all(&bytes).await?,
        Input::File(mut file) => {
            tokio::io::copy(&mut file, &mut child_stdin).await?;
        }
    }
    child_stdin.shutdown().await
}

#[async_trait]
impl ProcessOrchestrator for ComposeOrchestrator {
    async fn exec(&self, request: ExecRequest) -> ExecutionResult<CommandOutput> {
        let args = self.exec_args(&request);
        self.run(&request.service, request.display_command(), args, &request.env, &request.stdin)
            .await
    }

    async fn start_detached(&self, service: &ServiceDescriptor) -> ExecutionResult<CommandOutput> {
        let args = self.up_args(service);
        self.run(
            &service.name,
            format!("up -d {}", service.name),
            args,
            &BTreeMap::new(),
            &StdinSource::Null,
        )
        .await
    }
}

/// Read an entire output stream, capped at `MAX_OUTPUT_BYTES`
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}
