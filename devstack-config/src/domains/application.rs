//! Application service configuration

use devstack_core::{LogicalDatabase, ServiceDescriptor};
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_command, validate_required_string, Validatable};

/// Placeholder substituted with the logical database name in
/// `migration_command`
pub const DATABASE_PLACEHOLDER: &str = "{database}";

/// Application (dependent service) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Orchestrator service running the application
    #[serde(default = "default_service")]
    pub service: String,

    /// Command run inside `service` to migrate one logical database
    #[serde(default = "default_migration_command")]
    pub migration_command: Vec<String>,

    /// Logical databases migrated when a migrate step lists none
    #[serde(default = "default_logical_databases")]
    pub logical_databases: Vec<LogicalDatabase>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            migration_command: default_migration_command(),
            logical_databases: default_logical_databases(),
        }
    }
}

impl ApplicationConfig {
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(self.service.clone())
    }

    /// Migration command with the placeholder replaced by `database`
    pub fn migration_argv(&self, database: &LogicalDatabase) -> Vec<String> {
        self.migration_command
            .iter()
            .map(|arg| arg.replace(DATABASE_PLACEHOLDER, database.as_str()))
            .collect()
    }
}

impl Validatable for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.service, "service", self.domain_name())?;
        validate_command(&self.migration_command, "migration_command", self.domain_name())?;

        if !self
            .migration_command
            .iter()
            .any(|arg| arg.contains(DATABASE_PLACEHOLDER))
        {
            return Err(self.validation_error(format!(
                "migration_command must contain the {} placeholder",
                DATABASE_PLACEHOLDER
            )));
        }

        for db in &self.logical_databases {
            validate_required_string(db.as_str(), "logical_databases[]", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "application"
    }
}

// Default value functions
fn default_service() -> String {
    "lms".to_string()
}

fn default_migration_command() -> Vec<String> {
    [
        "python",
        "/edx/app/edxapp/edx-platform/manage.py",
        "lms",
        "migrate",
        "--settings",
        "devstack_docker",
        "--database",
        DATABASE_PLACEHOLDER,
        "--noinput",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_logical_databases() -> Vec<LogicalDatabase> {
    vec![
        LogicalDatabase::from("default"),
        LogicalDatabase::from("student_module_history"),
    ]
}
