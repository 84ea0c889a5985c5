//! Sessions command implementation

use colored::Colorize;
use mon_core::{InfraConfig, SessionLog};

use crate::error::Result;

/// Run the sessions command
pub fn run_sessions(config: &InfraConfig, environment: Option<&str>, json: bool) -> Result<()> {
    let sessions: Vec<_> = SessionLog::new(config.sessions_log())
        .sessions()?
        .into_iter()
        .filter(|s| environment.is_none_or(|e| s.environment.eq_ignore_ascii_case(e)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("{}", "No staged sessions".dimmed());
        return Ok(());
    }

    println!("{}", "Staged Sessions".bold());
    println!();
    for session in &sessions {
        println!(
            "  {}  {:<6} {:<22} {} staged, {} unchanged  {}",
            &session.id[..8.min(session.id.len())],
            session.environment.cyan(),
            session.status.to_string(),
            session.count(mon_core::FileStatus::Staged),
            session.count(mon_core::FileStatus::Unchanged),
            session.updated.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    Ok(())
}
