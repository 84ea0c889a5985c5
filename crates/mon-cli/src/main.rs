//! Monforge CLI
//!
//! Generates check-system and log-pipeline configuration from a service
//! descriptor and deploys it to the hosts named in the infrastructure
//! configuration.

mod cli;
mod commands;
mod context;
mod error;
mod logging;
mod signals;

use clap::Parser;
use colored::Colorize;

use cli::{BackupAction, Cli, Commands, RunArgs, SynthesisArgs, overrides};
use context::{load_config, load_config_or_default};
use error::Result;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: could not initialize logging: {}", "warning".yellow().bold(), e);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_path();
    match cli.command {
        Commands::Generate {
            descriptor,
            environments,
            out,
            check,
            selection,
            synthesis,
        } => {
            let config = load_config_or_default(config_path, &overrides(synthesis, RunArgs::default()))?;
            commands::run_generate(&config, &descriptor, &environments, &out, check, selection.selection())
        }
        Commands::Deploy {
            descriptor,
            environment,
            selection,
            synthesis,
            run,
            json,
        } => {
            let config = load_config(config_path, &overrides(synthesis, run))?;
            commands::run_deploy(&config, &descriptor, &environment, selection.selection(), json)
        }
        Commands::DeployArtifacts {
            dir,
            selection,
            run,
            json,
        } => {
            let config = load_config(config_path, &overrides(SynthesisArgs::default(), run))?;
            commands::run_deploy_artifacts(&config, &dir, selection.selection(), json)
        }
        Commands::Stage {
            descriptor,
            environment,
            synthesis,
        } => {
            let config = load_config(config_path, &overrides(synthesis, RunArgs::default()))?;
            commands::run_stage(&config, &descriptor, &environment)
        }
        Commands::ValidateImport { id } => {
            let config = load_config(config_path, &Default::default())?;
            commands::run_validate_import(&config, &id)
        }
        Commands::Sessions { environment, json } => {
            let config = load_config(config_path, &Default::default())?;
            commands::run_sessions(&config, environment.as_deref(), json)
        }
        Commands::Backups { action } => {
            let config = load_config(config_path, &Default::default())?;
            match action {
                BackupAction::List { environment, host } => {
                    commands::run_backups_list(&config, environment.as_deref(), host.as_deref())
                }
                BackupAction::Prune { keep } => commands::run_backups_prune(&config, keep),
            }
        }
        Commands::Protocols => {
            let config = load_config_or_default(config_path, &Default::default())?;
            commands::run_protocols(&config)
        }
    }
}
