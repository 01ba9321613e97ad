//! Process orchestrator configuration
//!
//! Everything the orchestrator needs to run a command is spelled out here,
//! including the working directory and environment. Commands never rely on
//! the provisioner's own current directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_duration, validate_required_string, Validatable};

/// Orchestrator (docker compose) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Program invoked for every orchestrator request
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the compose-level options (e.g. `compose`)
    #[serde(default = "default_base_args")]
    pub base_args: Vec<String>,

    /// Compose files, relative to `project_dir` unless absolute
    #[serde(default)]
    pub compose_files: Vec<PathBuf>,

    /// Compose project name
    #[serde(default)]
    pub project_name: Option<String>,

    /// Working directory for orchestrator commands and base for relative
    /// artifact paths
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,

    /// Extra environment passed to orchestrator commands
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Whether orchestrator commands inherit the provisioner's environment
    #[serde(default = "crate::domains::utils::default_true")]
    pub inherit_env: bool,

    /// Upper bound for a single orchestrator command (`10m`, `90s`)
    #[serde(with = "humantime_serde", default, skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            base_args: default_base_args(),
            compose_files: Vec::new(),
            project_name: None,
            project_dir: default_project_dir(),
            env: BTreeMap::new(),
            inherit_env: true,
            command_timeout: None,
        }
    }
}

impl OrchestratorConfig {
    /// Resolve a path against the project directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}

impl Validatable for OrchestratorConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.program, "program", self.domain_name())?;

        if self.project_dir.as_os_str().is_empty() {
            return Err(self.validation_error("project_dir cannot be empty"));
        }

        if let Some(ref name) = self.project_name {
            validate_required_string(name, "project_name", self.domain_name())?;
        }

        if let Some(timeout) = self.command_timeout {
            validate_duration(timeout, "command_timeout", self.domain_name())?;
        }

        for key in self.env.keys() {
            if key.is_empty() || key.contains('=') {
                return Err(self.validation_error(format!("invalid environment variable name '{}'", key)));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "orchestrator"
    }
}

// Default value functions
fn default_program() -> String {
    "docker".to_string()
}

fn default_base_args() -> Vec<String> {
    vec!["compose".to_string()]
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}
