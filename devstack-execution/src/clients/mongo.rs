//! Document store client backed by the `mongo` shell and `mongorestore`

use async_trait::async_trait;
use devstack_config::DocumentConfig;
use devstack_core::DatastoreTarget;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::DatastoreClient;
use crate::error::ExecutionResult;
use crate::orchestrator::{ExecRequest, ProcessOrchestrator};

pub struct MongoClient {
    orchestrator: Arc<dyn ProcessOrchestrator>,
    config: DocumentConfig,
    target: DatastoreTarget,
}

impl MongoClient {
    pub fn new(orchestrator: Arc<dyn ProcessOrchestrator>, config: DocumentConfig) -> Self {
        let target = config.target();
        Self {
            orchestrator,
            config,
            target,
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
impl DatastoreClient for MongoClient {
    fn target(&self) -> &DatastoreTarget {
        &self.target
    }

    async fn ping(&self) -> ExecutionResult<()> {
        let argv = vec![
            self.config.client.clone(),
            "--quiet".to_string(),
            "--eval".to_string(),
            self.config.health_query.clone(),
        ];
        self.run_checked(ExecRequest::new(self.config.service.clone(), argv))
            .await
    }

    async fn run_script(&self, script: &Path) -> ExecutionResult<()> {
        info!(datastore = %self.target, script = %script.display(), "Running mongo shell script");
        let request = ExecRequest::new(self.config.service.clone(), vec![self.config.client.clone()])
            .with_stdin_file(script);
        self.run_checked(request).await
    }

    async fn restore_dump(&self, dump: &Path, database: Option<&str>) -> ExecutionResult<()> {
        if let Some(db) = database {
            warn!(database = db, "Archive restores carry their own namespaces; ignoring database");
        }
        info!(datastore = %self.target, dump = %dump.display(), "Restoring compressed archive");
        let argv = vec![
            self.config.restore_client.clone(),
            "--gzip".to_string(),
            "--archive".to_string(),
        ];
        let request = ExecRequest::new(self.config.service.clone(), argv).with_stdin_file(dump);
        self.run_checked(request).await
    }
}
