use anyhow::{Context, Result};
use clap::Parser;
use devstack_config::{ConfigLoader, DevstackConfig};
use devstack_logging::{init_logging_from_config, init_simple_tracing};
use devstack_provision::{
    build_plan, describe_plan, BootstrapSequencer, Collaborators, ConsoleReporter, PlanEntry, ProgressReporter,
    RunContext, RunResult, TracingReporter,
};
use devstack_resilience::{cancel_on_signal, shutdown_signal, CancellationToken};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

mod cli;
use cli::{Cli, Commands, ConfigCommands, OutputFormat};

/// Exit status of a run stopped by Ctrl-C or SIGTERM
const EXIT_CANCELLED: u8 = 130;

/// Load configuration from the given file, or from the environment and
/// defaults when no file is given
///
/// A file that was named but does not exist is an error.
fn load_config(config_path: Option<&PathBuf>) -> Result<DevstackConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            info!("Loading configuration from: {:?}", path);
            loader
                .from_file(path)
                .context(format!("Failed to load configuration from {:?}", path))
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

fn print_plan(entries: &[PlanEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for entry in entries {
                println!("{:>2}. {:<20} {:<9} {}", entry.index + 1, entry.name, entry.kind, entry.description);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(entries).context("Failed to serialize plan")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn handle_plan(config: &DevstackConfig, format: OutputFormat) -> Result<()> {
    let collaborators = Collaborators::from_config(config);
    let steps = build_plan(config, &collaborators).context("Failed to build provisioning plan")?;
    print_plan(&describe_plan(&steps), format)
}

fn exit_code(result: &RunResult) -> ExitCode {
    if result.succeeded() {
        ExitCode::SUCCESS
    } else if result.cancelled() {
        ExitCode::from(EXIT_CANCELLED)
    } else {
        ExitCode::FAILURE
    }
}

/// Run the provisioning pipeline
async fn handle_provision(config: DevstackConfig, dry_run: bool, output: OutputFormat, no_color: bool) -> Result<ExitCode> {
    let collaborators = Collaborators::from_config(&config);
    let steps = build_plan(&config, &collaborators).context("Failed to build provisioning plan")?;

    if dry_run {
        info!("Dry run, no commands will be executed");
        print_plan(&describe_plan(&steps), output)?;
        return Ok(ExitCode::SUCCESS);
    }

    let reporter: Arc<dyn ProgressReporter> = match output {
        OutputFormat::Text => Arc::new(ConsoleReporter::stdout(!no_color)),
        OutputFormat::Json => Arc::new(TracingReporter),
    };

    let cancel = CancellationToken::new();
    let signal_task = cancel_on_signal(cancel.clone(), shutdown_signal());

    let ctx = RunContext::new(Arc::new(config), cancel.clone(), reporter);
    let result = BootstrapSequencer::new(steps).run(&ctx).await;

    // Releases the signal task
    cancel.cancel();
    let _ = signal_task.await;

    match output {
        OutputFormat::Text => match result.error() {
            None => println!("✅ Provisioning complete ({} steps)", result.report.steps.len()),
            Some(e) if result.cancelled() => println!("⚠️  Provisioning cancelled: {}", e),
            Some(e) => println!("❌ Provisioning failed: {}", e),
        },
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result.report).context("Failed to serialize run report")?;
            println!("{}", json);
        }
    }

    if let Some(e) = result.error() {
        error!(error_code = e.error_code(), "Provisioning run ended: {}", e);
    }

    Ok(exit_code(&result))
}

/// Handle configuration validation
fn handle_config_validate(config_file: &PathBuf) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!("Configuration file not found: {:?}", config_file));
    }

    match load_config(Some(config_file)) {
        Ok(_config) => {
            println!("✅ Configuration file is valid");
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {:#}", e);
            error!("Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Handle configuration generation
fn handle_config_generate(output: &PathBuf, force: bool) -> Result<()> {
    info!("Generating sample configuration at: {:?}", output);

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, DevstackConfig::generate_sample()).context("Failed to write configuration file")?;

    println!("✅ Sample configuration generated at: {:?}", output);
    println!("📝 Edit the file to customize settings for your environment");
    println!("🔧 Validate with: devstack config validate --config-file {:?}", output);

    Ok(())
}

/// Handle configuration display
fn handle_config_show(config: &DevstackConfig, format: &str) -> Result<()> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let yaml = serde_yaml::to_string(config).context("Failed to serialize to YAML")?;
            println!("{}", yaml);
        }
        "json" => {
            let json = serde_json::to_string_pretty(config).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        _ => {
            return Err(anyhow::anyhow!("Unknown output format: {}. Valid formats: yaml, json", format));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Commands that work on a file of their own need no loaded configuration
    if let Some(Commands::Config {
        config_cmd: ref cmd @ (ConfigCommands::Validate { .. } | ConfigCommands::Generate { .. }),
    }) = cli.command
    {
        init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
        match cmd {
            ConfigCommands::Validate { config_file } => handle_config_validate(config_file)?,
            ConfigCommands::Generate { output, force } => handle_config_generate(output, *force)?,
            ConfigCommands::Show { .. } => {}
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("info"))?;
            return Err(e);
        }
    };
    init_logging_from_config(&config.logging, cli.log_level.as_deref())?;

    match cli.command {
        Some(Commands::Provision {
            dry_run,
            output,
            no_color,
        }) => handle_provision(config, dry_run, output, no_color).await,
        Some(Commands::Plan { output }) => {
            handle_plan(&config, output)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config {
            config_cmd: ConfigCommands::Show { ref format },
        }) => {
            handle_config_show(&config, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config { .. }) => Ok(ExitCode::SUCCESS),
        None => {
            // If no subcommand is provided, print help
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help().context("Failed to print help")?;
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}
