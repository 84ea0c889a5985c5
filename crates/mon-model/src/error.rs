//! Error types for mon-model

/// Result type for mon-model operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A descriptor field is missing or holds an invalid value
    #[error("Invalid service descriptor: {field}: {message}")]
    InputValidation { field: String, message: String },

    /// The document could not be read or parsed
    #[error(transparent)]
    Document(#[from] mon_fs::Error),
}

impl Error {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}
