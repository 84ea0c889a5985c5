//! Error types for mon-core

use crate::transport::TransportError;
use std::path::PathBuf;

/// Result type for mon-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating, deploying or staging artifacts
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid infrastructure configuration value
    #[error("Configuration error at {field}: {message}")]
    Config { field: String, message: String },

    /// A `${VAR}` credential reference whose variable is unset
    #[error("Environment variable {variable} referenced by {field} is not set")]
    MissingSecret { variable: String, field: String },

    /// Environment not declared in the descriptor, manifest or configuration
    #[error("Unknown environment '{name}'")]
    UnknownEnvironment { name: String },

    /// Environment without hosts cannot be deployed
    #[error("Environment '{environment}' has no hosts to deploy to")]
    NoHosts { environment: String },

    /// Synthesis produced configuration errors; every problem is listed
    #[error("Synthesis failed with {} problem(s):\n  {}", .problems.len(), .problems.join("\n  "))]
    Synthesis { problems: Vec<String> },

    /// Artifact manifest is missing, unreadable or does not match the files
    #[error("Invalid artifact manifest at {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// No session with this id in the session log
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    /// Session is not in a state that allows the requested step
    #[error("Session {id} is {status}; {action} requires {required}")]
    InvalidSessionState {
        id: String,
        status: String,
        action: String,
        required: String,
    },

    /// HTTP client could not be constructed
    #[error("HTTP client error: {message}")]
    HttpClient { message: String },

    // Transparent wrappers for underlying crate errors
    /// Remote operation failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Filesystem error from mon-fs
    #[error(transparent)]
    Fs(#[from] mon_fs::Error),

    /// Descriptor error from mon-model
    #[error(transparent)]
    Model(#[from] mon_model::Error),

    /// Plugin registry error from mon-checks
    #[error(transparent)]
    Checks(#[from] mon_checks::Error),

    /// Log pipeline error from mon-logs
    #[error(transparent)]
    Logs(#[from] mon_logs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }
}
