//! Configuration loading and environment variable handling

use crate::domains::utils::parse_seconds;
use crate::domains::logging::{LogFormat, LogLevel};
use crate::domains::DevstackConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "DEVSTACK".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<DevstackConfig> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: DevstackConfig = serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<DevstackConfig> {
        let mut config = DevstackConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<DevstackConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut DevstackConfig) -> ConfigResult<()> {
        self.apply_orchestrator_overrides(&mut config.orchestrator)?;
        self.apply_datastore_overrides(config)?;
        self.apply_readiness_overrides(&mut config.readiness)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply orchestrator config overrides
    fn apply_orchestrator_overrides(
        &self,
        config: &mut crate::domains::orchestrator::OrchestratorConfig,
    ) -> ConfigResult<()> {
        if let Ok(dir) = self.get_env_var("PROJECT_DIR") {
            config.project_dir = PathBuf::from(dir);
        }

        if let Ok(project) = self.get_env_var("COMPOSE_PROJECT") {
            config.project_name = Some(project);
        }

        // Colon-separated, like COMPOSE_FILE
        if let Ok(files) = self.get_env_var("COMPOSE_FILE") {
            config.compose_files = files
                .split(':')
                .filter(|f| !f.trim().is_empty())
                .map(PathBuf::from)
                .collect();
        }

        Ok(())
    }

    /// Apply relational, document and application overrides
    fn apply_datastore_overrides(&self, config: &mut DevstackConfig) -> ConfigResult<()> {
        if let Ok(service) = self.get_env_var("RELATIONAL_SERVICE") {
            config.relational.service = service;
        }

        if let Ok(password) = self.get_env_var("RELATIONAL_PASSWORD") {
            config.relational.password = Some(password);
        }

        if let Ok(service) = self.get_env_var("DOCUMENT_SERVICE") {
            config.document.service = service;
        }

        if let Ok(service) = self.get_env_var("APP_SERVICE") {
            config.application.service = service;
        }

        Ok(())
    }

    /// Apply readiness config overrides
    fn apply_readiness_overrides(
        &self,
        config: &mut crate::domains::readiness::ReadinessConfig,
    ) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("READINESS_TIMEOUT") {
            config.timeout = parse_seconds(&timeout).map_err(|e| self.env_error("READINESS_TIMEOUT", e))?;
        }

        if let Ok(interval) = self.get_env_var("READINESS_INTERVAL") {
            config.interval = parse_seconds(&interval).map_err(|e| self.env_error("READINESS_INTERVAL", e))?;
            if config.max_interval < config.interval {
                config.max_interval = config.interval;
            }
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level).map_err(|e| self.env_error("LOG_LEVEL", e))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format).map_err(|e| self.env_error("LOG_FORMAT", e))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }

    fn env_error(&self, name: &str, message: impl ToString) -> ConfigError {
        ConfigError::EnvError {
            var: format!("{}_{}", self.prefix, name),
            message: message.to_string(),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
