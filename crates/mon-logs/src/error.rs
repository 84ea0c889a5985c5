//! Error types for log pipeline synthesis

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A pattern token with no grammar fragment, raised in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("log source '{source_name}': unknown pattern token '{token}' in \"{pattern}\"")]
pub struct PatternCompilationError {
    pub source_name: String,
    pub token: String,
    pub pattern: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    PatternCompilation(#[from] PatternCompilationError),

    #[error("log source '{source_name}': cannot parse retention '{value}': {message}")]
    Retention {
        source_name: String,
        value: String,
        message: String,
    },

    #[error("log source '{source_name}': compiled expression is not a valid regex: {message}")]
    Expression {
        source_name: String,
        message: String,
    },

    #[error("Failed to render {artifact}: {message}")]
    Render { artifact: String, message: String },
}

impl Error {
    /// Name of the log source the error belongs to, if any.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Self::PatternCompilation(e) => Some(&e.source_name),
            Self::Retention { source_name, .. } | Self::Expression { source_name, .. } => {
                Some(source_name)
            }
            Self::Render { .. } => None,
        }
    }
}
