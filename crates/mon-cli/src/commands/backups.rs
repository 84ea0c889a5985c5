//! Backups command implementations

use colored::Colorize;
use mon_core::{BackupLog, InfraConfig};

use crate::error::Result;

/// Run the backups list command
pub fn run_backups_list(config: &InfraConfig, environment: Option<&str>, host: Option<&str>) -> Result<()> {
    let records: Vec<_> = BackupLog::new(config.backups_log())
        .records()?
        .into_iter()
        .filter(|r| environment.is_none_or(|e| r.environment.eq_ignore_ascii_case(e)))
        .filter(|r| host.is_none_or(|h| r.host == h))
        .collect();

    if records.is_empty() {
        println!("{}", "No backups".dimmed());
        return Ok(());
    }
    println!("{}", "Backups".bold());
    println!();
    for record in &records {
        println!(
            "  {}  {:<6} {:<20} {} files ({} new)  {}",
            &record.id[..8.min(record.id.len())],
            record.environment.cyan(),
            record.host,
            record.entries.len(),
            record.tombstones(),
            record.created.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    Ok(())
}

/// Run the backups prune command
pub fn run_backups_prune(config: &InfraConfig, keep: usize) -> Result<()> {
    let dropped = BackupLog::new(config.backups_log()).prune(keep)?;
    if dropped.is_empty() {
        println!("{}", "Nothing to prune".dimmed());
    } else {
        for record in &dropped {
            println!("  {} {} {} {}", "-".red(), record.id, record.environment, record.host);
        }
        println!(
            "{} Pruned {} record(s); copies on the hosts were left in place.",
            "OK".green().bold(),
            dropped.len()
        );
    }
    Ok(())
}
