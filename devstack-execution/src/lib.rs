//! Devstack execution layer
//!
//! This crate talks to the outside world: the process orchestrator that runs
//! commands inside service containers, and the relational and document
//! datastore clients built on top of it.

pub mod clients;
pub mod compose;
pub mod error;
pub mod orchestrator;

// Re-export main types
pub use clients::{AppMigrator, DatastoreClient, MongoClient, MysqlClient, SchemaMigrator};
pub use compose::ComposeOrchestrator;
pub use error::{ExecutionError, ExecutionResult};
pub use orchestrator::{CommandOutput, ExecRequest, ProcessOrchestrator, StdinSource};
