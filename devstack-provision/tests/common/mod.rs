//! Shared fixtures: an in-memory stand-in for the compose environment

#![allow(dead_code)]

use async_trait::async_trait;
use devstack_config::DevstackConfig;
use devstack_core::ServiceDescriptor;
use devstack_execution::{CommandOutput, ExecRequest, ExecutionError, ExecutionResult, ProcessOrchestrator, StdinSource};
use devstack_provision::{build_plan, BootstrapSequencer, Collaborators, RecordingReporter, RunContext, RunResult};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const GUARDED_USERS_SQL: &str = "\
CREATE DATABASE IF NOT EXISTS edxapp;
CREATE DATABASE IF NOT EXISTS edxapp_csmh;
CREATE USER IF NOT EXISTS 'edxapp001'@'%' IDENTIFIED BY 'password';
GRANT ALL ON edxapp.* TO 'edxapp001'@'%';
FLUSH PRIVILEGES;
";

pub const UNGUARDED_USERS_SQL: &str = "\
CREATE DATABASE edxapp;
CREATE USER 'edxapp001'@'%' IDENTIFIED BY 'password';
";

#[derive(Default)]
struct State {
    users: BTreeSet<String>,
    databases: BTreeSet<String>,
    started: Vec<String>,
    migrated: Vec<String>,
    commands: Vec<String>,
    document_pings: u32,
}

/// Stateful orchestrator double
///
/// Relational scripts create users and databases; an unguarded CREATE of an
/// existing object fails the way the real client does. The document store
/// answers its health query from the `document_ready_on`-th ping on.
pub struct FakeEnvironment {
    state: Mutex<State>,
    pub document_ready_on: u32,
    pub failing_migration: Option<String>,
}

impl Default for FakeEnvironment {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            document_ready_on: 1,
            failing_migration: None,
        }
    }
}

impl FakeEnvironment {
    /// Document store that fails its health query until the `n`-th ping
    pub fn with_ready_on(n: u32) -> Self {
        Self {
            document_ready_on: n,
            ..Default::default()
        }
    }

    /// Environment whose migration of `database` fails
    pub fn failing(database: &str) -> Self {
        Self {
            failing_migration: Some(database.to_string()),
            ..Default::default()
        }
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn migrated(&self) -> Vec<String> {
        self.state.lock().unwrap().migrated.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn databases(&self) -> Vec<String> {
        self.state.lock().unwrap().databases.iter().cloned().collect()
    }

    pub fn document_pings(&self) -> u32 {
        self.state.lock().unwrap().document_pings
    }

    fn apply_sql(state: &mut State, sql: &str) -> CommandOutput {
        for statement in sql.split(';') {
            let tokens: Vec<String> = statement.split_whitespace().map(str::to_string).collect();
            if tokens.len() < 3 || !tokens[0].eq_ignore_ascii_case("CREATE") {
                continue;
            }
            let guarded = tokens.len() > 5
                && tokens[2].eq_ignore_ascii_case("IF")
                && tokens[3].eq_ignore_ascii_case("NOT")
                && tokens[4].eq_ignore_ascii_case("EXISTS");
            let object = if guarded { &tokens[5] } else { &tokens[2] };

            let existing = match tokens[1].to_uppercase().as_str() {
                "USER" => &mut state.users,
                "DATABASE" => &mut state.databases,
                _ => continue,
            };
            if !existing.insert(object.clone()) && !guarded {
                return CommandOutput::failure(
                    1,
                    format!("ERROR 1007 (HY000): Can't create {} {}; it exists", tokens[1], object),
                );
            }
        }
        CommandOutput::success()
    }

    fn respond(&self, request: &ExecRequest, input: Option<Vec<u8>>) -> CommandOutput {
        let mut state = self.state.lock().unwrap();
        state
            .commands
            .push(format!("{}: {}", request.service, request.display_command()));

        let argv: Vec<&str> = request.argv.iter().map(String::as_str).collect();
        match argv.as_slice() {
            ["mysql", .., "-e", _] => CommandOutput::success(),
            // Only the relational client reads its input as text
            ["mysql", "-u", _] => {
                let sql = String::from_utf8_lossy(input.as_deref().unwrap_or_default()).into_owned();
                Self::apply_sql(&mut state, &sql)
            }
            ["mysql", "-u", _, database] => {
                if state.databases.contains(*database) {
                    CommandOutput::success()
                } else {
                    CommandOutput::failure(1, format!("ERROR 1049 (42000): Unknown database '{}'", database))
                }
            }
            ["mongo", "--quiet", "--eval", _] => {
                state.document_pings += 1;
                if state.document_pings >= self.document_ready_on {
                    CommandOutput::success()
                } else {
                    CommandOutput::failure(1, "connect failed")
                }
            }
            ["mongo"] => CommandOutput::success(),
            ["mongorestore", ..] => match input.as_deref() {
                Some([0x1f, 0x8b, ..]) => CommandOutput::success(),
                _ => CommandOutput::failure(1, "Failed: stream or file does not appear to be in gzip format"),
            },
            [.., "--database", database, "--noinput"] => {
                if !state.started.iter().any(|s| s == &request.service) {
                    return CommandOutput::failure(1, format!("service \"{}\" is not running", request.service));
                }
                if self.failing_migration.as_deref() == Some(*database) {
                    return CommandOutput::failure(1, "django.db.utils.OperationalError: (1050, table exists)");
                }
                state.migrated.push(database.to_string());
                CommandOutput::success()
            }
            _ => CommandOutput::failure(127, format!("unexpected command: {}", request.display_command())),
        }
    }
}

#[async_trait]
impl ProcessOrchestrator for FakeEnvironment {
    async fn exec(&self, request: ExecRequest) -> ExecutionResult<CommandOutput> {
        let input = match request.stdin {
            StdinSource::File(ref path) => Some(std::fs::read(path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExecutionError::ArtifactNotFound { path: path.clone() },
                _ => ExecutionError::Io {
                    program: request.argv.first().cloned().unwrap_or_default(),
                    source: e,
                },
            })?),
            StdinSource::Bytes(ref bytes) => Some(bytes.clone()),
            StdinSource::Null => None,
        };
        Ok(self.respond(&request, input))
    }

    async fn start_detached(&self, service: &ServiceDescriptor) -> ExecutionResult<CommandOutput> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(format!("up -d {}", service));
        state.started.push(service.name.clone());
        Ok(CommandOutput::success())
    }
}

/// A project directory holding the default seed artifacts
pub fn project_dir(users_sql: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let provision = dir.path().join("provision");
    std::fs::create_dir_all(&provision).unwrap();
    std::fs::write(provision.join("provision.sql"), users_sql).unwrap();
    std::fs::write(provision.join("edxapp.sql"), "INSERT INTO auth_user VALUES (1, 'edx');\n").unwrap();
    std::fs::write(provision.join("mongo-provision.js"), "db.createUser({user: 'cs_comments_service'});\n").unwrap();
    std::fs::write(provision.join("mongo-dump.archive.gz"), [0x1f, 0x8b, 0x08]).unwrap();
    dir
}

pub fn config_for(project: &Path) -> DevstackConfig {
    let mut config = DevstackConfig::default();
    config.orchestrator.project_dir = project.to_path_buf();
    config
}

/// Build the plan against `env` and run it to completion
pub async fn run_against(
    config: &DevstackConfig,
    env: Arc<FakeEnvironment>,
    cancel: CancellationToken,
) -> (RunResult, Arc<RecordingReporter>) {
    let collaborators = Collaborators::with_orchestrator(config, env);
    let steps = build_plan(config, &collaborators).unwrap();

    let reporter = Arc::new(RecordingReporter::new());
    let ctx = RunContext::new(Arc::new(config.clone()), cancel, reporter.clone());
    let result = BootstrapSequencer::new(steps).run(&ctx).await;
    (result, reporter)
}
