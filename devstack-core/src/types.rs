//! Core type definitions for the provisioner

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Technology family of a datastore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreKind {
    /// SQL engine (MySQL in the default devstack)
    Relational,
    /// Document store (MongoDB in the default devstack)
    Document,
}

impl DatastoreKind {
    /// Get the string representation of the datastore kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DatastoreKind::Relational => "relational",
            DatastoreKind::Document => "document",
        }
    }

    /// Get all supported datastore kinds
    pub fn all() -> &'static [DatastoreKind] {
        &[DatastoreKind::Relational, DatastoreKind::Document]
    }
}

impl fmt::Display for DatastoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatastoreKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relational" | "mysql" | "sql" => Ok(DatastoreKind::Relational),
            "document" | "mongo" | "mongodb" => Ok(DatastoreKind::Document),
            _ => Err(ParseError::InvalidDatastoreKind(s.to_string())),
        }
    }
}

/// A datastore endpoint the provisioner seeds or probes.
///
/// The connection details (client program, credentials) live in the
/// configuration; the target only carries what is needed to address the
/// store and to name it in markers and errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreTarget {
    pub kind: DatastoreKind,
    /// Orchestrator service hosting the datastore
    pub service: String,
}

impl DatastoreTarget {
    pub fn new(kind: DatastoreKind, service: impl Into<String>) -> Self {
        Self {
            kind,
            service: service.into(),
        }
    }
}

impl fmt::Display for DatastoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} datastore '{}'", self.kind, self.service)
    }
}

/// An independently migratable schema domain of the relational engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalDatabase(pub String);

impl LogicalDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        LogicalDatabase(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LogicalDatabase {
    fn from(name: &str) -> Self {
        LogicalDatabase(name.to_string())
    }
}

impl From<String> for LogicalDatabase {
    fn from(name: String) -> Self {
        LogicalDatabase(name)
    }
}

/// Bootstrap payload for a single datastore.
///
/// The user/role script always runs before the dump is restored, since the
/// restore relies on the credentials the script creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedArtifact {
    /// Script creating users, roles and databases
    pub users_script: Option<PathBuf>,
    /// Data dump to restore after the users exist
    pub dump: Option<PathBuf>,
    /// Database the dump is restored into (relational stores only)
    pub dump_database: Option<String>,
}

impl SeedArtifact {
    /// Whether the artifact has nothing to apply
    pub fn is_empty(&self) -> bool {
        self.users_script.is_none() && self.dump.is_none()
    }
}

/// A service the orchestrator can start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service name as known to the orchestrator
    pub name: String,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Errors raised when parsing core types from strings
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid datastore kind: {0}")]
    InvalidDatastoreKind(String),

    #[error("Invalid step kind: {0}")]
    InvalidStepKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datastore_kind_from_str() {
        assert_eq!(DatastoreKind::from_str("relational").unwrap(), DatastoreKind::Relational);
        assert_eq!(DatastoreKind::from_str("MySQL").unwrap(), DatastoreKind::Relational);
        assert_eq!(DatastoreKind::from_str("mongo").unwrap(), DatastoreKind::Document);
        assert!(DatastoreKind::from_str("redis").is_err());
    }

    #[test]
    fn test_datastore_target_display() {
        let target = DatastoreTarget::new(DatastoreKind::Document, "mongo");
        assert_eq!(target.to_string(), "document datastore 'mongo'");
    }

    #[test]
    fn test_logical_database_serializes_as_string() {
        let db = LogicalDatabase::from("student_module_history");
        assert_eq!(
            serde_json::to_string(&db).unwrap(),
            "\"student_module_history\""
        );
    }

    #[test]
    fn test_empty_seed_artifact() {
        assert!(SeedArtifact::default().is_empty());

        let artifact = SeedArtifact {
            dump: Some(PathBuf::from("edxapp.sql")),
            ..Default::default()
        };
        assert!(!artifact.is_empty());
    }
}
