//! Form engine error types.
//!
//! Field validation failures are not errors: they land in the error map.
//! `FormError` covers misuse at the call site and submit failures the engine
//! cannot represent as field errors.

use formstate_value::PathError;
use thiserror::Error;

/// Form engine operation error.
#[derive(Debug, Error)]
pub enum FormError {
    /// A field name could not be parsed into a path.
    #[error("invalid field name")]
    InvalidPath {
        #[from]
        source: PathError,
    },

    /// The named field has no registered value, validator or metadata.
    #[error("unknown field '{name}'")]
    UnknownField { name: String },

    /// Debounced validation was requested outside a tokio runtime.
    #[error("debounced validation of '{field}' requires a running tokio runtime")]
    NoRuntime { field: String },

    /// A rule definition names a pattern that does not compile.
    #[error("invalid pattern '{pattern}' for rule")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The caller's submit handler failed without field errors.
    #[error(transparent)]
    Submit(#[from] anyhow::Error),

    /// Configuration could not be parsed.
    #[error("invalid form configuration")]
    Config {
        #[from]
        source: toml::de::Error,
    },
}

impl FormError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidPath { source } => format!("The field name is not valid: {source}."),
            Self::UnknownField { name } => format!("The form has no field called '{name}'."),
            Self::NoRuntime { .. } => {
                "Validation could not be scheduled because no async runtime is running.".to_string()
            }
            Self::InvalidPattern { pattern, .. } => {
                format!("The validation pattern '{pattern}' is not a valid regular expression.")
            }
            Self::Submit(_) => "The form could not be submitted. Please try again.".to_string(),
            Self::Config { .. } => {
                "The form configuration could not be read. Check the file for typos.".to_string()
            }
        }
    }
}

/// Result type alias for form engine operations.
pub type Result<T> = std::result::Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_converts() {
        let err: FormError = PathError::Empty.into();
        assert!(matches!(err, FormError::InvalidPath { .. }));
        assert!(err.user_message().contains("must not be empty"));
    }

    #[test]
    fn test_submit_error_is_transparent() {
        let err = FormError::from(anyhow::anyhow!("gateway timeout"));
        assert_eq!(err.to_string(), "gateway timeout");
        assert!(!err.user_message().contains("gateway"));
    }
}
