//! Deploy command implementations

use colored::Colorize;
use mon_core::{
    ArtifactSet, CancelToken, Deployer, DeploymentReport, DeploymentStatus, Generator, GroupSelection,
    HostStatus, InfraConfig,
};
use mon_fs::NormalizedPath;
use std::path::Path;

use crate::error::{CliError, Result};

/// Run the deploy command: generate for one environment, then deploy.
pub fn run_deploy(
    config: &InfraConfig,
    descriptor: &Path,
    environment: &str,
    selection: GroupSelection,
    json: bool,
) -> Result<()> {
    let descriptor = crate::context::load_descriptor(descriptor)?;
    let generator = Generator::from_config(config)?;
    let synthesis = generator.synthesize(&descriptor, selection)?;
    for warning in &synthesis.warnings {
        tracing::warn!("{}", warning);
    }
    let set = generator.render(&descriptor, &synthesis, environment, selection)?;
    deploy_set(config, &set, json)
}

/// Run the deploy-artifacts command on a directory written by `generate`.
pub fn run_deploy_artifacts(config: &InfraConfig, dir: &Path, selection: GroupSelection, json: bool) -> Result<()> {
    let set = ArtifactSet::load(&NormalizedPath::new(dir))?.select(selection);
    if set.artifacts.is_empty() {
        return Err(CliError::user(format!("{} holds no artifacts for this selection", dir.display())));
    }
    deploy_set(config, &set, json)
}

fn deploy_set(config: &InfraConfig, set: &ArtifactSet, json: bool) -> Result<()> {
    let cancel = CancelToken::new();
    crate::signals::cancel_on_ctrl_c(cancel.clone());

    let deployer = Deployer::from_config(config, &set.environment, set.has_logs())?.with_cancel(cancel);
    let report = deployer.deploy(set)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    match CliError::from_deployment(&report) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn print_report(report: &DeploymentReport) {
    let title = format!("{} {}", report.service, report.environment);
    let status = match report.status {
        DeploymentStatus::Succeeded => report.status.to_string().green(),
        DeploymentStatus::DryRun => report.status.to_string().cyan(),
        DeploymentStatus::PartiallyFailed | DeploymentStatus::Cancelled => report.status.to_string().yellow(),
        DeploymentStatus::Failed => report.status.to_string().red(),
    };
    println!("{} {}: {}", "Deployment".bold(), title.bold(), status);
    println!("{}: {}", "Id".dimmed(), report.id);
    println!();

    for host in &report.hosts {
        let marker = match host.status {
            HostStatus::Succeeded => "+".green(),
            HostStatus::DryRun => "~".cyan(),
            HostStatus::Failed => "x".red(),
            HostStatus::Skipped | HostStatus::Cancelled => "-".yellow(),
        };
        println!("  {} {:<24} {} (stage {})", marker, host.host.cyan(), host.status, host.stage);
        for action in &host.planned {
            println!("      would {}", action);
        }
        if let Some(error) = &host.error {
            println!("      {}", error.to_string().red());
        }
        if host.rolled_back {
            println!("      {}", "rolled back".yellow());
        }
        if let Some(error) = &host.rollback_error {
            println!("      {} {}", "rollback failed:".red().bold(), error);
        }
    }

    for call in &report.admin {
        let result = match (&call.status, &call.error) {
            (_, Some(error)) => error.red().to_string(),
            (Some(code), None) => format!("HTTP {}", code),
            (None, None) => "planned".dimmed().to_string(),
        };
        println!("  PUT {} -> {}", call.path, result);
    }
    for error in &report.notification_errors {
        println!("{} notification failed: {}", "warning:".yellow().bold(), error);
    }
}
