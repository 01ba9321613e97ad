//! Turns the configured pipeline into runnable steps

use devstack_config::{DevstackConfig, StepSpec};
use devstack_core::{DatastoreKind, LogicalDatabase, ProvisionError, Result, ServiceDescriptor, StepKind};
use devstack_execution::{
    AppMigrator, ComposeOrchestrator, DatastoreClient, MongoClient, MysqlClient, ProcessOrchestrator,
    SchemaMigrator,
};
use serde::Serialize;
use std::sync::Arc;

use crate::activate::ServiceActivator;
use crate::migrate::MigrationRunner;
use crate::probe::ReadinessProber;
use crate::seed::SeedLoader;
use crate::step::Step;

/// External collaborators the steps drive
#[derive(Clone)]
pub struct Collaborators {
    pub orchestrator: Arc<dyn ProcessOrchestrator>,
    pub relational: Arc<dyn DatastoreClient>,
    pub document: Arc<dyn DatastoreClient>,
    pub migrator: Arc<dyn SchemaMigrator>,
}

impl Collaborators {
    /// Production wiring: `docker compose` and the datastore CLIs
    pub fn from_config(config: &DevstackConfig) -> Self {
        Self::with_orchestrator(config, Arc::new(ComposeOrchestrator::new(config.orchestrator.clone())))
    }

    /// Real datastore clients on top of any orchestrator
    pub fn with_orchestrator(config: &DevstackConfig, orchestrator: Arc<dyn ProcessOrchestrator>) -> Self {
        Self {
            relational: Arc::new(MysqlClient::new(orchestrator.clone(), config.relational.clone())),
            document: Arc::new(MongoClient::new(orchestrator.clone(), config.document.clone())),
            migrator: Arc::new(AppMigrator::new(orchestrator.clone(), config.application.clone())),
            orchestrator,
        }
    }

    fn datastore(&self, kind: DatastoreKind) -> Arc<dyn DatastoreClient> {
        match kind {
            DatastoreKind::Relational => self.relational.clone(),
            DatastoreKind::Document => self.document.clone(),
        }
    }
}

/// Build the ordered step list for a run
pub fn build_plan(config: &DevstackConfig, collaborators: &Collaborators) -> Result<Vec<Box<dyn Step>>> {
    config
        .validate_all()
        .map_err(|e| ProvisionError::InvalidPlan(e.to_string()))?;

    let mut steps: Vec<Box<dyn Step>> = Vec::with_capacity(config.pipeline.steps.len());
    for spec in &config.pipeline.steps {
        let name = spec.name();
        let step: Box<dyn Step> = match spec {
            StepSpec::Probe { target, timeout, .. } => Box::new(ReadinessProber::new(
                name,
                collaborators.datastore(*target),
                config.readiness.poll_policy(*timeout),
            )),
            StepSpec::Seed { target, .. } => {
                let files = match target {
                    DatastoreKind::Relational => &config.relational.seed,
                    DatastoreKind::Document => &config.document.seed,
                };
                let mut artifact = files.to_artifact();
                artifact.users_script = artifact.users_script.map(|p| config.orchestrator.resolve(p));
                artifact.dump = artifact.dump.map(|p| config.orchestrator.resolve(p));

                Box::new(SeedLoader::new(
                    name,
                    collaborators.datastore(*target),
                    artifact,
                    config.seeding.require_idempotent,
                ))
            }
            StepSpec::Activate { service, .. } => {
                let service = match service {
                    Some(service) => ServiceDescriptor::new(service.clone()),
                    None => config.application.descriptor(),
                };
                Box::new(ServiceActivator::new(name, collaborators.orchestrator.clone(), service))
            }
            StepSpec::Migrate { databases, .. } => {
                let databases: Vec<LogicalDatabase> = databases
                    .clone()
                    .unwrap_or_else(|| config.application.logical_databases.clone());
                if databases.is_empty() {
                    return Err(ProvisionError::InvalidPlan(format!("step '{}' has no logical databases", name)));
                }
                Box::new(MigrationRunner::new(name, collaborators.migrator.clone(), databases))
            }
        };
        steps.push(step);
    }

    Ok(steps)
}

/// One line of a dry-run listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub index: usize,
    pub name: String,
    pub kind: StepKind,
    pub description: String,
}

pub fn describe_plan(steps: &[Box<dyn Step>]) -> Vec<PlanEntry> {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| PlanEntry {
            index,
            name: step.name().to_string(),
            kind: step.kind(),
            description: step.describe(),
        })
        .collect()
}
