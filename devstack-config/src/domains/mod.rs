//! Domain-specific configuration modules

pub mod application;
pub mod datastore;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod readiness;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use devstack_core::DatastoreKind;
use serde::{Deserialize, Serialize};

/// Main devstack configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DevstackConfig {
    /// Process orchestrator configuration
    #[serde(default)]
    pub orchestrator: orchestrator::OrchestratorConfig,

    /// Relational engine configuration
    #[serde(default)]
    pub relational: datastore::RelationalConfig,

    /// Document store configuration
    #[serde(default)]
    pub document: datastore::DocumentConfig,

    /// Application service configuration
    #[serde(default)]
    pub application: application::ApplicationConfig,

    /// Readiness probing configuration
    #[serde(default)]
    pub readiness: readiness::ReadinessConfig,

    /// Seeding policy
    #[serde(default)]
    pub seeding: datastore::SeedingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Ordered provisioning steps
    #[serde(default)]
    pub pipeline: pipeline::PipelineConfig,
}

impl DevstackConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.orchestrator.validate()?;
        self.relational.validate()?;
        self.document.validate()?;
        self.application.validate()?;
        self.readiness.validate()?;
        self.seeding.validate()?;
        self.logging.validate()?;
        self.pipeline.validate()?;

        // Migrate steps that rely on the application defaults need some
        if self.application.logical_databases.is_empty()
            && self
                .pipeline
                .steps
                .iter()
                .any(|s| matches!(s, pipeline::StepSpec::Migrate { databases: None, .. }))
        {
            return Err(self
                .application
                .validation_error("logical_databases cannot be empty while a migrate step relies on it"));
        }

        Ok(())
    }

    /// Service name of the datastore of the given kind
    pub fn datastore_service(&self, kind: DatastoreKind) -> &str {
        match kind {
            DatastoreKind::Relational => &self.relational.service,
            DatastoreKind::Document => &self.document.service,
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = DevstackConfig::default();
        serde_yaml::to_string(&config).unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
