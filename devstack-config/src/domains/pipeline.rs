//! Provisioning pipeline configuration
//!
//! The run is a declarative list of steps. Each entry is resolved into an
//! executable step when the run starts, in the order given here.

use devstack_core::{DatastoreKind, LogicalDatabase, StepKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_duration, validate_required_string, Validatable};

/// One declared pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
    /// Wait until a datastore answers its health query
    Probe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        target: DatastoreKind,
        /// Overrides `readiness.timeout` for this step
        #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
        timeout: Option<Duration>,
    },
    /// Apply the configured seed artifacts to a datastore
    Seed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        target: DatastoreKind,
    },
    /// Start a service detached; defaults to the application service
    Activate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service: Option<String>,
    },
    /// Migrate logical databases; defaults to `application.logical_databases`
    Migrate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        databases: Option<Vec<LogicalDatabase>>,
    },
}

impl StepSpec {
    pub fn probe(target: DatastoreKind) -> Self {
        StepSpec::Probe {
            name: None,
            target,
            timeout: None,
        }
    }

    pub fn seed(target: DatastoreKind) -> Self {
        StepSpec::Seed { name: None, target }
    }

    pub fn activate(service: Option<String>) -> Self {
        StepSpec::Activate { name: None, service }
    }

    pub fn migrate(databases: Option<Vec<LogicalDatabase>>) -> Self {
        StepSpec::Migrate { name: None, databases }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            StepSpec::Probe { .. } => StepKind::Probe,
            StepSpec::Seed { .. } => StepKind::Seed,
            StepSpec::Activate { .. } => StepKind::Activate,
            StepSpec::Migrate { .. } => StepKind::Migrate,
        }
    }

    /// Step name, explicit or derived from the step's parameters
    pub fn name(&self) -> String {
        match self {
            StepSpec::Probe { name: Some(name), .. }
            | StepSpec::Seed { name: Some(name), .. }
            | StepSpec::Activate { name: Some(name), .. }
            | StepSpec::Migrate { name: Some(name), .. } => name.clone(),
            StepSpec::Probe { target, .. } => format!("wait-for-{}", target),
            StepSpec::Seed { target, .. } => format!("seed-{}", target),
            StepSpec::Activate { service: Some(service), .. } => format!("start-{}", service),
            StepSpec::Activate { service: None, .. } => "start-app".to_string(),
            StepSpec::Migrate { .. } => "migrate".to_string(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ordered steps
    #[serde(default = "default_steps")]
    pub steps: Vec<StepSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { steps: default_steps() }
    }
}

impl Validatable for PipelineConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.steps.is_empty() {
            return Err(self.validation_error("at least one step is required"));
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();
            validate_required_string(&name, &format!("steps[{}].name", index), self.domain_name())?;
            if !seen.insert(name.clone()) {
                return Err(self.validation_error(format!("duplicate step name '{}'", name)));
            }

            match step {
                StepSpec::Probe {
                    timeout: Some(timeout), ..
                } => {
                    validate_duration(*timeout, &format!("steps[{}].timeout", index), self.domain_name())?;
                }
                StepSpec::Activate {
                    service: Some(service), ..
                } => {
                    validate_required_string(service, &format!("steps[{}].service", index), self.domain_name())?;
                }
                StepSpec::Migrate {
                    databases: Some(databases),
                    ..
                } if databases.is_empty() => {
                    return Err(self.validation_error(format!(
                        "migrate step '{}' must name at least one database",
                        name
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "pipeline"
    }
}

fn default_steps() -> Vec<StepSpec> {
    vec![
        StepSpec::seed(DatastoreKind::Relational),
        StepSpec::probe(DatastoreKind::Document),
        StepSpec::seed(DatastoreKind::Document),
        StepSpec::activate(None),
        StepSpec::migrate(None),
    ]
}
