//! Error types for mon-checks

use std::path::PathBuf;

/// Result type for mon-checks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors raised while synthesizing a single dependency.
///
/// These never abort a whole run: the engine collects them per dependency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("dependency '{dependency}': unknown check protocol '{protocol}'")]
    UnknownProtocol { dependency: String, protocol: String },

    #[error("dependency '{dependency}': protocol '{protocol}' requires parameter '{parameter}'")]
    MissingParameter {
        dependency: String,
        protocol: String,
        parameter: String,
    },

    #[error("dependency '{dependency}': invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        dependency: String,
        parameter: String,
        message: String,
    },
}

impl SynthesisError {
    /// Name of the dependency the error is about.
    pub fn dependency(&self) -> &str {
        match self {
            Self::UnknownProtocol { dependency, .. }
            | Self::MissingParameter { dependency, .. }
            | Self::InvalidParameter { dependency, .. } => dependency,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid plugin definition {path}: {message}")]
    PluginDefinition { path: PathBuf, message: String },

    #[error("Protocol '{protocol}' is registered twice ({first} and {second})")]
    DuplicateProtocol {
        protocol: String,
        first: String,
        second: String,
    },

    #[error("Failed to build discovery HTTP client: {message}")]
    ProbeClient { message: String },

    #[error(transparent)]
    Fs(#[from] mon_fs::Error),
}
