//! Stage and validate-import command implementations

use colored::Colorize;
use mon_core::{
    DeploymentSession, FileStatus, Generator, GroupSelection, InfraConfig, SessionStatus, StagedImportAdapter,
};
use std::path::Path;

use crate::error::{CliError, Result, exit};

/// Run the stage command
pub fn run_stage(config: &InfraConfig, descriptor: &Path, environment: &str) -> Result<()> {
    let descriptor = crate::context::load_descriptor(descriptor)?;
    let generator = Generator::from_config(config)?;
    let selection = GroupSelection::checks_only();
    let synthesis = generator.synthesize(&descriptor, selection)?;
    for warning in &synthesis.warnings {
        tracing::warn!("{}", warning);
    }
    let set = generator.render(&descriptor, &synthesis, environment, selection)?;

    let adapter = StagedImportAdapter::from_config(config)?;
    let session = adapter.stage(&set)?;
    print_session(&session);

    if session.status == SessionStatus::Failed {
        return Err(CliError::outcome(
            exit::VALIDATION,
            session.message.unwrap_or_else(|| "staging failed".into()),
        ));
    }
    if let Some(path) = &session.instructions {
        println!();
        println!("{} {}", "Instructions:".bold(), path);
        println!(
            "After the import run {}",
            format!("monforge validate-import {}", session.id).cyan()
        );
    }
    Ok(())
}

/// Run the validate-import command
pub fn run_validate_import(config: &InfraConfig, id: &str) -> Result<()> {
    let adapter = StagedImportAdapter::from_config(config)?;
    let session = adapter.validate_import(id)?;
    print_session(&session);
    match session.status {
        SessionStatus::Validated => Ok(()),
        _ => Err(CliError::outcome(
            exit::VALIDATION,
            session.message.unwrap_or_else(|| "import validation failed".into()),
        )),
    }
}

fn print_session(session: &DeploymentSession) {
    let status = match session.status {
        SessionStatus::Validated => session.status.to_string().green(),
        SessionStatus::Failed => session.status.to_string().red(),
        _ => session.status.to_string().yellow(),
    };
    println!("{} {}: {}", "Session".bold(), session.id, status);
    println!(
        "{}: {} {}  {}: {}",
        "Service".dimmed(),
        session.service,
        session.environment.cyan(),
        "Host".dimmed(),
        session.host
    );
    for file in &session.files {
        let marker = match file.status {
            FileStatus::Staged => "+".green(),
            FileStatus::Unchanged => "=".dimmed(),
            FileStatus::Rejected => "x".red(),
        };
        println!("  {} {:<14} {}", marker, file.name, file.status);
    }
    if let Some(message) = &session.message {
        println!("  {}", message.red());
    }
}
