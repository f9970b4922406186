//! Error types for mbrl-jobs
//!
//! One error enum covers the whole pipeline: literal parsing, typed
//! extraction, validation, settings and the policy parameterisation.

use thiserror::Error;

/// Main error type for configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Syntax errors in the literal mapping text
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// The same key appears twice in one mapping; `first_line` is 0 when unknown
    #[error("Duplicate key '{key}' at line {line}{}", first_definition(.first_line))]
    DuplicateKey {
        key: String,
        first_line: usize,
        line: usize,
    },

    /// A required record field is absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field holds a value of the wrong kind
    #[error("Field '{field}' expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// A field holds a value outside its allowed domain
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Policy parameterisation errors
    #[error("Policy error: {0}")]
    Policy(String),

    /// Tool settings errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

fn first_definition(line: &usize) -> String {
    if *line == 0 {
        String::new()
    } else {
        format!(" (first defined at line {})", line)
    }
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Convert anyhow errors to ConfigError
impl From<anyhow::Error> for ConfigError {
    fn from(err: anyhow::Error) -> Self {
        ConfigError::Generic(err.to_string())
    }
}

impl ConfigError {
    pub(crate) fn type_mismatch(field: &str, expected: &str, found: &str) -> Self {
        ConfigError::TypeMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ConfigError::Parse {
            line: 12,
            column: 7,
            message: "unexpected ':'".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("line 12"));
        assert!(text.contains("column 7"));
    }

    #[test]
    fn test_duplicate_key_display() {
        let err = ConfigError::DuplicateKey {
            key: "seed".to_string(),
            first_line: 3,
            line: 9,
        };
        assert!(err.to_string().contains("'seed'"));
        assert!(err.to_string().contains("line 3"));
        assert!(err.to_string().contains("line 9"));

        let err = ConfigError::DuplicateKey {
            key: "seed".to_string(),
            first_line: 0,
            line: 4,
        };
        assert_eq!(err.to_string(), "Duplicate key 'seed' at line 4");
    }

    #[test]
    fn test_type_mismatch_helper() {
        let err = ConfigError::type_mismatch("fit_lr", "float", "str");
        assert_eq!(err.to_string(), "Field 'fit_lr' expected float, found str");
    }
}
