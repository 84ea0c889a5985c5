//! Generate command implementation

use colored::Colorize;
use mon_core::{Generator, GroupSelection, InfraConfig, check_syntax};
use mon_fs::NormalizedPath;
use std::path::Path;

use crate::error::{CliError, Result, exit};

/// Run the generate command
pub fn run_generate(
    config: &InfraConfig,
    descriptor: &Path,
    environments: &[String],
    out: &Path,
    check: bool,
    selection: GroupSelection,
) -> Result<()> {
    let descriptor = crate::context::load_descriptor(descriptor)?;
    let generator = Generator::from_config(config)?;
    let synthesis = generator.synthesize(&descriptor, selection)?;
    for warning in &synthesis.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    let names: Vec<String> = if environments.is_empty() {
        descriptor.environments.iter().map(|e| e.name.clone()).collect()
    } else {
        environments.to_vec()
    };

    let out = NormalizedPath::new(out);
    let mut issues = 0;
    for name in &names {
        let set = generator.render(&descriptor, &synthesis, name, selection)?;
        let dir = set.write(&out)?;
        println!(
            "{} {} {} ({} files, {} hosts) -> {}",
            "+".green(),
            set.service.bold(),
            set.environment.cyan(),
            set.artifacts.len(),
            set.hosts.len(),
            dir
        );

        if check {
            let found = check_syntax(&set);
            for issue in &found {
                println!("  {} {}", "x".red(), issue);
            }
            if found.is_empty() && set.has_checks() {
                println!("  {} check-system objects are consistent", "ok".green());
            }
            issues += found.len();
        }
    }

    if issues > 0 {
        return Err(CliError::outcome(
            exit::VALIDATION,
            format!("{} syntax issue(s) in generated check-system objects", issues),
        ));
    }
    Ok(())
}
