//! Migration runner: one logical database at a time, in order

use async_trait::async_trait;
use devstack_core::{LogicalDatabase, ProvisionError, Result, StepKind};
use devstack_execution::SchemaMigrator;
use std::sync::Arc;
use tracing::{error, info};

use crate::context::RunContext;
use crate::step::Step;

pub struct MigrationRunner {
    name: String,
    migrator: Arc<dyn SchemaMigrator>,
    databases: Vec<LogicalDatabase>,
}

impl MigrationRunner {
    pub fn new(name: impl Into<String>, migrator: Arc<dyn SchemaMigrator>, databases: Vec<LogicalDatabase>) -> Self {
        Self {
            name: name.into(),
            migrator,
            databases,
        }
    }

    pub fn databases(&self) -> &[LogicalDatabase] {
        &self.databases
    }
}

#[async_trait]
impl Step for MigrationRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StepKind {
        StepKind::Migrate
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.databases.iter().map(LogicalDatabase::as_str).collect();
        format!("migrate {}", names.join(", then "))
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        for database in &self.databases {
            if ctx.is_cancelled() {
                return Err(ProvisionError::Cancelled {
                    stage: format!("{} ({})", self.name, database),
                });
            }

            // A failed database stops the run; later ones are never attempted
            if let Err(e) = self.migrator.migrate(database).await {
                error!(%database, error = %e, "Migration failed");
                return Err(ProvisionError::MigrationFailure {
                    database: database.clone(),
                    exit_status: e.exit_status(),
                    detail: Some(e.to_string()),
                });
            }
            info!(%database, "Migrations applied");
        }
        Ok(())
    }
}
