//! Schema migrations run through the application's management command

use async_trait::async_trait;
use devstack_config::ApplicationConfig;
use devstack_core::LogicalDatabase;
use std::sync::Arc;
use tracing::info;

use super::SchemaMigrator;
use crate::error::ExecutionResult;
use crate::orchestrator::{ExecRequest, ProcessOrchestrator};

/// Runs `application.migration_command` inside the application service
pub struct AppMigrator {
    orchestrator: Arc<dyn ProcessOrchestrator>,
    config: ApplicationConfig,
}

impl AppMigrator {
    pub fn new(orchestrator: Arc<dyn ProcessOrchestrator>, config: ApplicationConfig) -> Self {
        Self { orchestrator, config }
    }
}

#[async_trait]
impl SchemaMigrator for AppMigrator {
    async fn migrate(&self, database: &LogicalDatabase) -> ExecutionResult<()> {
        let request = ExecRequest::new(self.config.service.clone(), self.config.migration_argv(database));
        let command = request.display_command();
        info!(service = %self.config.service, %database, "Running migrations");

        self.orchestrator
            .exec(request)
            .await?
            .check(&self.config.service, command)?;
        Ok(())
    }
}
