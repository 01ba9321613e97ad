//! Integration tests for devstack-config

use devstack_config::*;
use devstack_core::{DatastoreKind, LogicalDatabase};
use devstack_resilience::BackoffStrategy;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use temp_env::with_vars;

#[test]
fn test_default_config_validation() {
    let config = DevstackConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("DEVSTACK_PROJECT_DIR", Some("/srv/devstack")),
        ("DEVSTACK_COMPOSE_PROJECT", Some("edx")),
        ("DEVSTACK_COMPOSE_FILE", Some("docker-compose.yml:docker-compose-host.yml")),
        ("DEVSTACK_RELATIONAL_SERVICE", Some("mysql57")),
        ("DEVSTACK_RELATIONAL_PASSWORD", Some("s3cret")),
        ("DEVSTACK_DOCUMENT_SERVICE", Some("mongo4")),
        ("DEVSTACK_APP_SERVICE", Some("studio")),
        ("DEVSTACK_READINESS_TIMEOUT", Some("120")),
        ("DEVSTACK_READINESS_INTERVAL", Some("2")),
        ("DEVSTACK_LOG_LEVEL", Some("debug")),
        ("DEVSTACK_LOG_FORMAT", Some("json")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.orchestrator.project_dir, PathBuf::from("/srv/devstack"));
        assert_eq!(config.orchestrator.project_name.as_deref(), Some("edx"));
        assert_eq!(
            config.orchestrator.compose_files,
            vec![
                PathBuf::from("docker-compose.yml"),
                PathBuf::from("docker-compose-host.yml")
            ]
        );
        assert_eq!(config.relational.service, "mysql57");
        assert_eq!(config.relational.password.as_deref(), Some("s3cret"));
        assert_eq!(config.document.service, "mongo4");
        assert_eq!(config.application.service, "studio");
        assert_eq!(config.readiness.timeout, Duration::from_secs(120));
        assert_eq!(config.readiness.interval, Duration::from_secs(2));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    });
}

#[test]
fn test_invalid_env_value() {
    with_vars(vec![("DEVSTACK_READINESS_TIMEOUT", Some("soon"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { ref var, .. } if var == "DEVSTACK_READINESS_TIMEOUT"));
    });
}

#[test]
fn test_interval_override_raises_max_interval() {
    with_vars(vec![("DEVSTACK_READINESS_INTERVAL", Some("10"))], || {
        let config = ConfigLoader::new().from_env().unwrap();
        assert_eq!(config.readiness.interval, Duration::from_secs(10));
        assert_eq!(config.readiness.max_interval, Duration::from_secs(10));
    });
}

#[test]
fn test_custom_prefix_loader() {
    let vars = vec![
        ("CUSTOM_RELATIONAL_SERVICE", Some("db")),
        ("CUSTOM_LOG_LEVEL", Some("trace")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::with_prefix("CUSTOM");
        let config = loader.from_env().unwrap();

        assert_eq!(config.relational.service, "db");
        assert_eq!(config.logging.level, LogLevel::Trace);
    });
}

#[test]
fn test_comprehensive_config_file() {
    let yaml = r#"
orchestrator:
  project_dir: /srv/devstack
  project_name: edx
  compose_files: [docker-compose.yml]
  env:
    COMPOSE_HTTP_TIMEOUT: "200"
  command_timeout: 10m

relational:
  service: mysql
  user: root
  seed:
    users_script: provision/provision.sql
    dump: provision/edxapp.sql
    dump_database: edxapp

document:
  service: mongo
  seed:
    users_script: provision/mongo-provision.js

application:
  service: lms
  logical_databases: [default, student_module_history]

readiness:
  interval: 500ms
  max_interval: 500ms
  timeout: 45s
  backoff:
    type: fixed

seeding:
  require_idempotent: false

logging:
  level: warn
  format: compact

pipeline:
  steps:
    - kind: probe
      target: relational
    - kind: seed
      target: relational
    - kind: probe
      target: document
      timeout: 90s
    - kind: seed
      target: document
    - kind: activate
    - kind: migrate
      databases: [default]
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(Vec::<(&str, Option<&str>)>::new(), || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.orchestrator.project_name.as_deref(), Some("edx"));
        assert_eq!(config.orchestrator.command_timeout, Some(Duration::from_secs(600)));
        assert_eq!(
            config.orchestrator.env.get("COMPOSE_HTTP_TIMEOUT").map(String::as_str),
            Some("200")
        );
        assert!(config.document.seed.dump.is_none());
        assert_eq!(config.readiness.interval, Duration::from_millis(500));
        assert!(matches!(config.readiness.backoff, BackoffStrategy::Fixed));
        assert!(!config.seeding.require_idempotent);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.pipeline.steps.len(), 6);
        assert_eq!(config.pipeline.steps[0].name(), "wait-for-relational");
        assert_eq!(
            config.pipeline.steps[5],
            StepSpec::Migrate {
                name: None,
                databases: Some(vec![LogicalDatabase::from("default")]),
            }
        );
    });
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::new()
        .from_file(dir.path().join("missing.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileReadError { .. }));
    assert!(err.to_string().contains("missing.yaml"));
}

#[test]
fn test_validation_errors() {
    let mut config = DevstackConfig::default();
    config.readiness.timeout = Duration::ZERO;
    assert!(config.validate_all().is_err());

    config = DevstackConfig::default();
    config.relational.service = String::new();
    assert!(config.validate_all().is_err());

    config = DevstackConfig::default();
    config.application.migration_command = vec!["manage.py".to_string(), "migrate".to_string()];
    assert!(config.validate_all().is_err());

    config = DevstackConfig::default();
    config.pipeline.steps.push(StepSpec::seed(DatastoreKind::Relational));
    let err = config.validate_all().unwrap_err();
    assert!(matches!(err, ConfigError::DomainError { ref domain, .. } if domain == "pipeline"));
}

#[test]
fn test_generate_sample_config() {
    let sample = DevstackConfig::generate_sample();
    assert!(!sample.is_empty());
    assert!(sample.contains("orchestrator:"));
    assert!(sample.contains("relational:"));
    assert!(sample.contains("document:"));
    assert!(sample.contains("readiness:"));
    assert!(sample.contains("pipeline:"));
    assert!(!sample.contains("password"));

    let parsed: DevstackConfig = serde_yaml::from_str(&sample).unwrap();
    assert!(parsed.validate_all().is_ok());
}
