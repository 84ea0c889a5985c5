//! Protocols command implementation

use colored::Colorize;
use mon_core::{Generator, InfraConfig};

use crate::error::Result;

/// Run the protocols command
pub fn run_protocols(config: &InfraConfig) -> Result<()> {
    let generator = Generator::from_config(config)?;
    let registry = generator.registry();

    println!("{}", "Check Protocols".bold());
    println!();
    for key in registry.list() {
        let Some(plugin) = registry.get(key) else {
            continue;
        };
        println!("  {:<12} {}", key.green(), plugin.description());
        let aliases = plugin.aliases();
        if !aliases.is_empty() {
            println!("  {:<12} {} {}", "", "aliases:".dimmed(), aliases.join(", "));
        }
        let required = plugin.required_params();
        if !required.is_empty() {
            println!("  {:<12} {} {}", "", "requires:".dimmed(), required.join(", "));
        }
    }
    println!();
    println!("{} protocols registered", registry.list().len());
    Ok(())
}
