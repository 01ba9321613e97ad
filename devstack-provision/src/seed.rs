//! Seed loader: applies user scripts and data dumps to one datastore

use async_trait::async_trait;
use devstack_core::{DatastoreKind, ProvisionError, Result, SeedArtifact, StepKind};
use devstack_execution::{DatastoreClient, ExecutionError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::context::RunContext;
use crate::step::Step;

/// Statement prefixes that fail on a second run unless guarded
const GUARDED_CREATES: &[&str] = &["CREATE USER", "CREATE ROLE", "CREATE DATABASE", "CREATE SCHEMA"];

/// A user script that would not survive being applied twice
#[derive(Debug, Error)]
#[error("{} is not re-runnable; add IF NOT EXISTS to: {}", path.display(), statements.join("; "))]
pub struct IdempotencyViolation {
    pub path: PathBuf,
    pub statements: Vec<String>,
}

/// CREATE USER/ROLE/DATABASE/SCHEMA statements lacking `IF NOT EXISTS`
///
/// Line comments (`--`, `#`) and block comments are ignored. Statements are
/// returned whitespace-normalised.
pub fn non_idempotent_statements(sql: &str) -> Vec<String> {
    strip_comments(sql)
        .split(';')
        .map(|stmt| stmt.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|stmt| {
            let upper = stmt.to_uppercase();
            GUARDED_CREATES.iter().any(|prefix| upper.starts_with(prefix)) && !upper.contains("IF NOT EXISTS")
        })
        .collect()
}

fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);

    out.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("--") || trimmed.starts_with('#') {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct SeedLoader {
    name: String,
    client: Arc<dyn DatastoreClient>,
    /// Artifact with paths already resolved against the project directory
    artifact: SeedArtifact,
    require_idempotent: bool,
}

impl SeedLoader {
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn DatastoreClient>,
        artifact: SeedArtifact,
        require_idempotent: bool,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            artifact,
            require_idempotent,
        }
    }

    fn failure(&self, source: impl Into<devstack_core::BoxError>) -> ProvisionError {
        ProvisionError::seed_failure(self.client.target().clone(), source)
    }

    async fn ensure_exists(&self, path: &Path) -> Result<()> {
        match tokio::fs::metadata(path).await {
            Ok(_) => Ok(()),
            Err(_) => Err(self.failure(ExecutionError::ArtifactNotFound {
                path: path.to_path_buf(),
            })),
        }
    }

    /// Reject relational user scripts that would fail when re-applied
    async fn lint(&self, script: &Path) -> Result<()> {
        if !self.require_idempotent || self.client.target().kind != DatastoreKind::Relational {
            return Ok(());
        }

        let sql = tokio::fs::read_to_string(script).await.map_err(|e| self.failure(e))?;
        let statements = non_idempotent_statements(&sql);
        if statements.is_empty() {
            return Ok(());
        }

        Err(self.failure(IdempotencyViolation {
            path: script.to_path_buf(),
            statements,
        }))
    }
}

#[async_trait]
impl Step for SeedLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StepKind {
        StepKind::Seed
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref script) = self.artifact.users_script {
            parts.push(format!("script {}", script.display()));
        }
        if let Some(ref dump) = self.artifact.dump {
            match self.artifact.dump_database {
                Some(ref db) => parts.push(format!("dump {} into '{}'", dump.display(), db)),
                None => parts.push(format!("dump {}", dump.display())),
            }
        }
        if parts.is_empty() {
            parts.push("nothing to apply".to_string());
        }
        format!("seed {}: {}", self.client.target(), parts.join(", then "))
    }

    async fn run(&self, _ctx: &RunContext) -> Result<()> {
        let target = self.client.target();
        if self.artifact.is_empty() {
            debug!(%target, "No seed artifacts configured");
            return Ok(());
        }

        // Everything is checked before the first command runs
        if let Some(ref script) = self.artifact.users_script {
            self.ensure_exists(script).await?;
            self.lint(script).await?;
        }
        if let Some(ref dump) = self.artifact.dump {
            self.ensure_exists(dump).await?;
        }

        if let Some(ref script) = self.artifact.users_script {
            self.client.run_script(script).await.map_err(|e| self.failure(e))?;
        } else {
            debug!(%target, "No user script configured");
        }

        if let Some(ref dump) = self.artifact.dump {
            self.client
                .restore_dump(dump, self.artifact.dump_database.as_deref())
                .await
                .map_err(|e| self.failure(e))?;
        } else {
            debug!(%target, "No dump configured");
        }

        info!(%target, "Seeding complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingReporter;
    use devstack_config::DevstackConfig;
    use devstack_core::DatastoreTarget;
    use devstack_execution::ExecutionResult;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct RecordingStore {
        target: Option<DatastoreTarget>,
        calls: Mutex<Vec<String>>,
        fail_dump: bool,
    }

    impl RecordingStore {
        fn relational() -> Self {
            Self {
                target: Some(DatastoreTarget::new(DatastoreKind::Relational, "mysql")),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DatastoreClient for RecordingStore {
        fn target(&self) -> &DatastoreTarget {
            self.target.as_ref().unwrap()
        }

        async fn ping(&self) -> ExecutionResult<()> {
            Ok(())
        }

        async fn run_script(&self, script: &Path) -> ExecutionResult<()> {
            self.calls.lock().unwrap().push(format!("script {}", script.display()));
            Ok(())
        }

        async fn restore_dump(&self, dump: &Path, database: Option<&str>) -> ExecutionResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("dump {} {}", dump.display(), database.unwrap_or("-")));
            if self.fail_dump {
                return Err(ExecutionError::CommandFailed {
                    service: "mysql".to_string(),
                    command: "mysql -u root edxapp".to_string(),
                    status: devstack_core::ExitStatus(Some(1)),
                    stderr: "ERROR 1064".to_string(),
                });
            }
            Ok(())
        }
    }

    fn context() -> RunContext {
        RunContext::new(
            Arc::new(DevstackConfig::default()),
            CancellationToken::new(),
            Arc::new(RecordingReporter::new()),
        )
    }

    #[test]
    fn test_lint_flags_unguarded_creates() {
        let sql = r#"
-- CREATE USER 'commented'@'%';
CREATE DATABASE IF NOT EXISTS edxapp;
create user 'edxapp001'@'%' IDENTIFIED BY 'password';
CREATE USER IF NOT EXISTS 'read_only'@'%';
/* CREATE DATABASE hidden; */
GRANT ALL ON edxapp.* TO 'edxapp001'@'%';
CREATE
  DATABASE
  csmh;
"#;
        let violations = non_idempotent_statements(sql);
        assert_eq!(
            violations,
            vec![
                "create user 'edxapp001'@'%' IDENTIFIED BY 'password'",
                "CREATE DATABASE csmh",
            ]
        );
    }

    #[test]
    fn test_lint_accepts_guarded_script() {
        let sql = "CREATE DATABASE IF NOT EXISTS edxapp;\nCREATE USER IF NOT EXISTS 'u'@'%';\nFLUSH PRIVILEGES;";
        assert!(non_idempotent_statements(sql).is_empty());
    }

    #[tokio::test]
    async fn test_script_then_dump() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("provision.sql");
        let dump = dir.path().join("edxapp.sql");
        std::fs::write(&script, "CREATE DATABASE IF NOT EXISTS edxapp;").unwrap();
        std::fs::write(&dump, "INSERT INTO t VALUES (1);").unwrap();

        let store = Arc::new(RecordingStore::relational());
        let loader = SeedLoader::new(
            "seed-relational",
            store.clone(),
            SeedArtifact {
                users_script: Some(script.clone()),
                dump: Some(dump.clone()),
                dump_database: Some("edxapp".to_string()),
            },
            true,
        );

        loader.run(&context()).await.unwrap();
        assert_eq!(
            store.calls(),
            vec![
                format!("script {}", script.display()),
                format!("dump {} edxapp", dump.display()),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_idempotent_script_rejected_before_execution() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("provision.sql");
        std::fs::write(&script, "CREATE USER 'edxapp001'@'%';").unwrap();

        let store = Arc::new(RecordingStore::relational());
        let loader = SeedLoader::new(
            "seed-relational",
            store.clone(),
            SeedArtifact {
                users_script: Some(script),
                ..Default::default()
            },
            true,
        );

        let err = loader.run(&context()).await.unwrap_err();
        assert_eq!(err.error_code(), "SEED_EXECUTION_FAILURE");
        assert!(err.to_string().contains("IF NOT EXISTS"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_before_any_command() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("provision.sql");
        std::fs::write(&script, "SELECT 1;").unwrap();

        let store = Arc::new(RecordingStore::relational());
        let loader = SeedLoader::new(
            "seed-relational",
            store.clone(),
            SeedArtifact {
                users_script: Some(script),
                dump: Some(dir.path().join("missing.sql")),
                dump_database: None,
            },
            true,
        );

        let err = loader.run(&context()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::SeedExecutionFailure { .. }));
        assert!(err.to_string().contains("missing.sql"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dump_failure_is_seed_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("edxapp.sql");
        std::fs::write(&dump, "garbage").unwrap();

        let store = Arc::new(RecordingStore {
            fail_dump: true,
            ..RecordingStore::relational()
        });
        let loader = SeedLoader::new(
            "seed-relational",
            store,
            SeedArtifact {
                dump: Some(dump),
                dump_database: Some("edxapp".to_string()),
                ..Default::default()
            },
            true,
        );

        let err = loader.run(&context()).await.unwrap_err();
        match err {
            ProvisionError::SeedExecutionFailure { target, .. } => {
                assert_eq!(target.kind, DatastoreKind::Relational);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_artifact_is_a_no_op() {
        let store = Arc::new(RecordingStore::relational());
        let loader = SeedLoader::new("seed-relational", store.clone(), SeedArtifact::default(), true);

        loader.run(&context()).await.unwrap();
        assert!(store.calls().is_empty());
    }
}
