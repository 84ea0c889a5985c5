//! Error types for mon-cli

use mon_core::DeploymentStatus;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Process exit codes; success is 0.
pub mod exit {
    pub const INTERNAL: i32 = 1;
    pub const INPUT: i32 = 2;
    pub const VALIDATION: i32 = 3;
    pub const TRANSPORT: i32 = 4;
    pub const PARTIAL: i32 = 5;
    pub const CANCELLED: i32 = 130;
}

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from mon-core
    #[error(transparent)]
    Core(#[from] mon_core::Error),

    /// Descriptor error from mon-model
    #[error(transparent)]
    Model(#[from] mon_model::Error),

    /// Error from mon-fs
    #[error(transparent)]
    Fs(#[from] mon_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Report serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },

    /// The command ran and reported a non-successful outcome
    #[error("{message}")]
    Outcome { code: i32, message: String },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn outcome(code: i32, message: impl Into<String>) -> Self {
        Self::Outcome {
            code,
            message: message.into(),
        }
    }

    /// Failure for a finished deployment, `None` when it succeeded.
    pub fn from_deployment(report: &mon_core::DeploymentReport) -> Option<Self> {
        let code = match report.status {
            DeploymentStatus::Succeeded | DeploymentStatus::DryRun => return None,
            DeploymentStatus::PartiallyFailed => exit::PARTIAL,
            DeploymentStatus::Cancelled => exit::CANCELLED,
            DeploymentStatus::Failed if report.has_validation_failure() => exit::VALIDATION,
            DeploymentStatus::Failed => exit::TRANSPORT,
        };
        Some(Self::outcome(
            code,
            format!("deployment {} to {}: {}", report.id, report.environment, report.status),
        ))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(e) => core_exit_code(e),
            Self::Model(_) | Self::User { .. } => exit::INPUT,
            Self::Fs(e) => fs_exit_code(e),
            Self::Io(_) | Self::Json(_) => exit::INTERNAL,
            Self::Outcome { code, .. } => *code,
        }
    }
}

fn core_exit_code(error: &mon_core::Error) -> i32 {
    use mon_core::Error;
    match error {
        Error::Transport(_) => exit::TRANSPORT,
        Error::Fs(e) => fs_exit_code(e),
        Error::HttpClient { .. } | Error::Io(_) => exit::INTERNAL,
        Error::Config { .. }
        | Error::MissingSecret { .. }
        | Error::UnknownEnvironment { .. }
        | Error::NoHosts { .. }
        | Error::Synthesis { .. }
        | Error::Manifest { .. }
        | Error::SessionNotFound { .. }
        | Error::InvalidSessionState { .. }
        | Error::Model(_)
        | Error::Checks(_)
        | Error::Logs(_) => exit::INPUT,
    }
}

fn fs_exit_code(error: &mon_fs::Error) -> i32 {
    match error {
        mon_fs::Error::Parse { .. }
        | mon_fs::Error::UnsupportedFormat { .. }
        | mon_fs::Error::CorruptRecord { .. } => exit::INPUT,
        _ => exit::INTERNAL,
    }
}
