//! # Deposit Error Types
//!
//! Typed error handling for the dorm-deposit engine.
//! All fallible operations return `Result<T, DepositError>`.

use thiserror::Error;

/// Core error type for all deposit operations
#[derive(Debug, Error)]
pub enum DepositError {
    /// Configuration errors (missing env vars, bad catalog file)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single form field failed validation
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Record not found in a store
    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    /// Illegal payment status transition
    #[error("Cannot transition payment from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// An account already exists for this email
    #[error("User with email {email} already exists")]
    DuplicateEmail { email: String },

    /// Email/password pair did not match
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Bearer token missing or not in the session list
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller does not own the record
    #[error("Forbidden")]
    Forbidden,

    /// A required field was missing from a request
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Storage backend failure (file I/O, serialization of a collection)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Network/HTTP error talking to the remote store
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DepositError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DepositError::Network(_) | DepositError::Storage(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            DepositError::Configuration(_) => 500,
            DepositError::Validation { .. } => 400,
            DepositError::RecordNotFound { .. } => 404,
            DepositError::InvalidTransition { .. } => 409,
            DepositError::DuplicateEmail { .. } => 400,
            DepositError::InvalidCredentials => 401,
            DepositError::Unauthorized => 401,
            DepositError::Forbidden => 403,
            DepositError::MissingField { .. } => 400,
            DepositError::Storage(_) => 500,
            DepositError::Network(_) => 503,
            DepositError::Serialization(_) => 500,
            DepositError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for DepositError {
    fn from(err: serde_json::Error) -> Self {
        DepositError::Serialization(err.to_string())
    }
}

/// Result type alias for deposit operations
pub type DepositResult<T> = Result<T, DepositError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(DepositError::Network("timeout".into()).is_retryable());
        assert!(DepositError::Storage("disk full".into()).is_retryable());
        assert!(!DepositError::Validation {
            field: "cvc".into(),
            message: "must be 3 digits".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DepositError::RecordNotFound { id: "x".into() }.status_code(),
            404
        );
        assert_eq!(
            DepositError::InvalidTransition {
                from: "refunded".into(),
                to: "authorized".into()
            }
            .status_code(),
            409
        );
        assert_eq!(DepositError::Unauthorized.status_code(), 401);
        assert_eq!(
            DepositError::MissingField { field: "dormId".into() }.status_code(),
            400
        );
    }
}
