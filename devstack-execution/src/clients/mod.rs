//! Datastore clients
//!
//! Each client drives the command-line tools that live inside the datastore
//! service through a [`ProcessOrchestrator`](crate::ProcessOrchestrator).

pub mod migrator;
pub mod mongo;
pub mod mysql;

use async_trait::async_trait;
use devstack_core::{DatastoreTarget, LogicalDatabase};
use std::path::Path;

use crate::error::ExecutionResult;

pub use migrator::AppMigrator;
pub use mongo::MongoClient;
pub use mysql::MysqlClient;

/// Operations the provisioner needs from a datastore
#[async_trait]
pub trait DatastoreClient: Send + Sync {
    /// The datastore this client talks to
    fn target(&self) -> &DatastoreTarget;

    /// Evaluate the health query; `Ok` means the store answers
    async fn ping(&self) -> ExecutionResult<()>;

    /// Run a user/role creation script
    async fn run_script(&self, script: &Path) -> ExecutionResult<()>;

    /// Restore a data dump, optionally into a named database
    async fn restore_dump(&self, dump: &Path, database: Option<&str>) -> ExecutionResult<()>;
}

/// Applies schema migrations for one logical database at a time
#[async_trait]
pub trait SchemaMigrator: Send + Sync {
    async fn migrate(&self, database: &LogicalDatabase) -> ExecutionResult<()>;
}
