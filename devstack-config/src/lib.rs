//! Domain-driven configuration management for the devstack provisioner
//!
//! This crate provides modular configuration split by functional domains,
//! with validation, defaults, and environment variable support. The
//! configuration is the single explicit source for everything a run needs:
//! the working directory and environment handed to the orchestrator, the
//! datastore endpoints, the seed artifacts and the ordered step list.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    application::ApplicationConfig,
    datastore::{DocumentConfig, RelationalConfig, SeedFiles, SeedingConfig},
    logging::{LogFormat, LogLevel, LoggingConfig},
    orchestrator::OrchestratorConfig,
    pipeline::{PipelineConfig, StepSpec},
    readiness::ReadinessConfig,
    DevstackConfig,
};

