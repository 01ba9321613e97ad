//! Relational engine client backed by the `mysql` CLI

use async_trait::async_trait;
use devstack_config::RelationalConfig;
use devstack_core::DatastoreTarget;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::DatastoreClient;
use crate::error::ExecutionResult;
use crate::orchestrator::{ExecRequest, ProcessOrchestrator};

/// Environment variable the mysql client reads the password from
const PASSWORD_ENV: &str = "MYSQL_PWD";

pub struct MysqlClient {
    orchestrator: Arc<dyn ProcessOrchestrator>,
    config: RelationalConfig,
    target: DatastoreTarget,
}

impl MysqlClient {
    pub fn new(orchestrator: Arc<dyn ProcessOrchestrator>, config: RelationalConfig) -> Self {
        let target = config.target();
        Self {
            orchestrator,
            config,
            target,
        }
    }

    /// Client invocation, with the password passed through the environment
    /// rather than the command line
    fn request(&self, extra: &[&str]) -> ExecRequest {
        let mut argv = vec![self.config.client.clone(), "-u".to_string(), self.config.user.clone()];
        argv.extend(extra.iter().map(|s| s.to_string()));

        let request = ExecRequest::new(self.config.service.clone(), argv);
        match self.config.password {
            Some(ref password) => request.with_env(PASSWORD_ENV, password.clone()),
            None => request,
        }
    }

    async fn run_checked(&self, request: ExecRequest) -> ExecutionResult<()> {
        let command = request.display_command();
        self.orchestrator
            .exec(request)
            .await?
            .check(&self.config.service, command)?;
        Ok(())
    }
}

#[async_trait]
impl DatastoreClient for MysqlClient {
    fn target(&self) -> &DatastoreTarget {
        &self.target
    }

    async fn ping(&self) -> ExecutionResult<()> {
        self.run_checked(self.request(&["-e", self.config.health_query.as_str()])).await
    }

    async fn run_script(&self, script: &Path) -> ExecutionResult<()> {
        info!(datastore = %self.target, script = %script.display(), "Running SQL script");
        self.run_checked(self.request(&[]).with_stdin_file(script)).await
    }

    async fn restore_dump(&self, dump: &Path, database: Option<&str>) -> ExecutionResult<()> {
        info!(datastore = %self.target, dump = %dump.display(), database, "Restoring SQL dump");
        let request = match database {
            Some(db) => self.request(&[db]),
            None => {
                debug!("No dump database configured, relying on the dump's own USE statements");
                self.request(&[])
            }
        };
        self.run_checked(request.with_stdin_file(dump)).await
    }
}
