//! Logging initialisation for the devstack provisioner
//!
//! Logs go to stderr through a `tracing-subscriber` formatter chosen by
//! configuration. Records emitted through the `log` facade by the
//! configuration and resilience crates are bridged into the same subscriber.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
