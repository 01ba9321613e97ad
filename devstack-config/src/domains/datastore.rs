//! Datastore configuration: the relational engine, the document store and
//! the seed artifacts applied to each

use devstack_core::{DatastoreKind, DatastoreTarget, SeedArtifact};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};

/// Seed files for one datastore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedFiles {
    /// User/role creation script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_script: Option<PathBuf>,

    /// Data dump restored after the users exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump: Option<PathBuf>,

    /// Target database for the dump (relational only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_database: Option<String>,
}

impl SeedFiles {
    /// Convert into a core seed artifact
    pub fn to_artifact(&self) -> SeedArtifact {
        SeedArtifact {
            users_script: self.users_script.clone(),
            dump: self.dump.clone(),
            dump_database: self.dump_database.clone(),
        }
    }
}

/// Relational engine (MySQL) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalConfig {
    /// Orchestrator service running the engine
    #[serde(default = "default_relational_service")]
    pub service: String,

    /// SQL client program inside the service
    #[serde(default = "default_relational_client")]
    pub client: String,

    /// User the client authenticates as
    #[serde(default = "default_relational_user")]
    pub user: String,

    /// Password for `user`; omitted from the command line when unset
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Query used as the health predicate
    #[serde(default = "default_relational_health_query")]
    pub health_query: String,

    /// Seed artifacts
    #[serde(default = "default_relational_seed")]
    pub seed: SeedFiles,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            service: default_relational_service(),
            client: default_relational_client(),
            user: default_relational_user(),
            password: None,
            health_query: default_relational_health_query(),
            seed: default_relational_seed(),
        }
    }
}

impl RelationalConfig {
    pub fn target(&self) -> DatastoreTarget {
        DatastoreTarget::new(DatastoreKind::Relational, self.service.clone())
    }
}

impl Validatable for RelationalConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.service, "service", self.domain_name())?;
        validate_required_string(&self.client, "client", self.domain_name())?;
        validate_required_string(&self.user, "user", self.domain_name())?;
        validate_required_string(&self.health_query, "health_query", self.domain_name())?;

        if let Some(ref db) = self.seed.dump_database {
            validate_required_string(db, "seed.dump_database", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "relational"
    }
}

/// Document store (MongoDB) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Orchestrator service running the store
    #[serde(default = "default_document_service")]
    pub service: String,

    /// Shell client program inside the service
    #[serde(default = "default_document_client")]
    pub client: String,

    /// Restore program inside the service
    #[serde(default = "default_document_restore_client")]
    pub restore_client: String,

    /// Expression evaluated by the shell client as the health predicate
    #[serde(default = "default_document_health_query")]
    pub health_query: String,

    /// Seed artifacts
    #[serde(default = "default_document_seed")]
    pub seed: SeedFiles,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            service: default_document_service(),
            client: default_document_client(),
            restore_client: default_document_restore_client(),
            health_query: default_document_health_query(),
            seed: default_document_seed(),
        }
    }
}

impl DocumentConfig {
    pub fn target(&self) -> DatastoreTarget {
        DatastoreTarget::new(DatastoreKind::Document, self.service.clone())
    }
}

impl Validatable for DocumentConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.service, "service", self.domain_name())?;
        validate_required_string(&self.client, "client", self.domain_name())?;
        validate_required_string(&self.restore_client, "restore_client", self.domain_name())?;
        validate_required_string(&self.health_query, "health_query", self.domain_name())?;

        if self.seed.dump_database.is_some() {
            return Err(self.validation_error("seed.dump_database is only supported for relational stores"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "document"
    }
}

/// Seeding policy shared by both datastores
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    /// Reject relational user/role scripts whose CREATE statements are not
    /// guarded with IF NOT EXISTS
    #[serde(default = "crate::domains::utils::default_true")]
    pub require_idempotent: bool,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            require_idempotent: true,
        }
    }
}

impl Validatable for SeedingConfig {
    fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "seeding"
    }
}

// Default value functions
fn default_relational_service() -> String {
    "mysql".to_string()
}

fn default_relational_client() -> String {
    "mysql".to_string()
}

fn default_relational_user() -> String {
    "root".to_string()
}

fn default_relational_health_query() -> String {
    "SELECT 1".to_string()
}

fn default_relational_seed() -> SeedFiles {
    SeedFiles {
        users_script: Some(PathBuf::from("provision/provision.sql")),
        dump: Some(PathBuf::from("provision/edxapp.sql")),
        dump_database: Some("edxapp".to_string()),
    }
}

fn default_document_service() -> String {
    "mongo".to_string()
}

fn default_document_client() -> String {
    "mongo".to_string()
}

fn default_document_restore_client() -> String {
    "mongorestore".to_string()
}

fn default_document_health_query() -> String {
    "db.serverStatus()".to_string()
}

fn default_document_seed() -> SeedFiles {
    SeedFiles {
        users_script: Some(PathBuf::from("provision/mongo-provision.js")),
        dump: Some(PathBuf::from("provision/mongo-dump.archive.gz")),
        dump_database: None,
    }
}
