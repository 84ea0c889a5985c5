//! CLI argument parsing using clap derive

use clap::{Args, Parser, Subcommand};
use mon_core::{ConfigOverrides, GroupSelection};
use std::path::PathBuf;

/// Monforge - Generate and deploy monitoring configuration for a service
#[derive(Parser, Debug)]
#[command(name = "monforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Infrastructure configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "MONFORGE_CONFIG", default_value = "monforge.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Synthesize artifacts and write them to disk
    ///
    /// Examples:
    ///   monforge generate service.json               # every environment
    ///   monforge generate service.json -e EXP --check
    Generate {
        /// Service descriptor (JSON or YAML)
        descriptor: PathBuf,

        /// Environments to render; all when omitted
        #[arg(short, long = "env")]
        environments: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,

        /// Syntax-check the generated check-system objects
        #[arg(long)]
        check: bool,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        synthesis: SynthesisArgs,
    },

    /// Generate and deploy to every host of an environment
    Deploy {
        /// Service descriptor (JSON or YAML)
        descriptor: PathBuf,

        /// Target environment
        #[arg(short, long = "env")]
        environment: String,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        synthesis: SynthesisArgs,

        #[command(flatten)]
        run: RunArgs,

        /// Print the deployment report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deploy previously generated artifacts
    ///
    /// Takes an environment directory written by `generate`, e.g. out/EXP.
    DeployArtifacts {
        /// Directory containing manifest.json
        dir: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        run: RunArgs,

        /// Print the deployment report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stage check-system files for a manual NagiosQL import
    Stage {
        /// Service descriptor (JSON or YAML)
        descriptor: PathBuf,

        /// Target environment
        #[arg(short, long = "env")]
        environment: String,

        #[command(flatten)]
        synthesis: SynthesisArgs,
    },

    /// Confirm that a staged session was imported
    ValidateImport {
        /// Session id or a unique prefix of at least 8 characters
        id: String,
    },

    /// List staged import sessions
    Sessions {
        /// Only sessions of this environment
        #[arg(short, long = "env")]
        environment: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Inspect or prune the backup log
    Backups {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// List registered check protocols
    Protocols,
}

/// Backup log actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BackupAction {
    /// List backup records
    List {
        /// Only records of this environment
        #[arg(short, long = "env")]
        environment: Option<String>,

        /// Only records of this host
        #[arg(long)]
        host: Option<String>,
    },

    /// Keep the newest records per environment and host
    Prune {
        /// Records to keep per environment and host
        #[arg(long, default_value_t = 5)]
        keep: usize,
    },
}

/// Which artifact groups to process
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionArgs {
    /// Only check-system artifacts
    #[arg(long, conflicts_with = "logs_only")]
    pub checks_only: bool,

    /// Only log-pipeline artifacts
    #[arg(long)]
    pub logs_only: bool,
}

impl SelectionArgs {
    pub fn selection(self) -> GroupSelection {
        if self.checks_only {
            GroupSelection::checks_only()
        } else if self.logs_only {
            GroupSelection::logs_only()
        } else {
            GroupSelection::all()
        }
    }
}

/// Synthesis overrides
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisArgs {
    /// Fail on unknown pattern tokens instead of degrading them
    #[arg(long)]
    pub strict_patterns: bool,

    /// Probe dependencies to infer check parameters
    #[arg(long)]
    pub discover: bool,
}

/// Deployment overrides
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Log every step without touching any host
    #[arg(long)]
    pub dry_run: bool,

    /// Skip backups; failed hosts cannot be rolled back
    #[arg(long)]
    pub no_backup: bool,

    /// Hosts processed in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip remaining hosts after the first failure
    #[arg(long)]
    pub stop_on_first_failure: bool,
}

/// Collect command-line overrides for the configuration file.
pub fn overrides(synthesis: SynthesisArgs, run: RunArgs) -> ConfigOverrides {
    ConfigOverrides {
        dry_run: run.dry_run,
        no_backup: run.no_backup,
        concurrency: run.concurrency,
        stop_on_first_failure: run.stop_on_first_failure,
        strict_patterns: synthesis.strict_patterns,
        discover: synthesis.discover,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_deploy_with_overrides() {
        let cli = Cli::try_parse_from([
            "monforge",
            "deploy",
            "service.json",
            "--env",
            "EXP",
            "--dry-run",
            "--concurrency",
            "3",
            "--checks-only",
        ])
        .unwrap();

        match cli.command {
            Commands::Deploy {
                environment,
                selection,
                run,
                json,
                ..
            } => {
                assert_eq!(environment, "EXP");
                assert_eq!(selection.selection(), GroupSelection::checks_only());
                assert!(run.dry_run);
                assert_eq!(run.concurrency, Some(3));
                assert!(!json);
            }
            other => panic!("expected deploy, got {:?}", other),
        }
    }

    #[test]
    fn selection_flags_conflict() {
        let result = Cli::try_parse_from([
            "monforge",
            "generate",
            "service.json",
            "--checks-only",
            "--logs-only",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_backups_prune() {
        let cli = Cli::try_parse_from(["monforge", "backups", "prune", "--keep", "2"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Backups {
                action: BackupAction::Prune { keep: 2 }
            }
        );
        assert_eq!(cli.config, PathBuf::from("monforge.toml"));
    }

    #[test]
    fn deploy_requires_environment() {
        assert!(Cli::try_parse_from(["monforge", "deploy", "service.json"]).is_err());
    }
}
