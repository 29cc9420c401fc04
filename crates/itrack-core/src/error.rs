//! Error types for itrack.

use thiserror::Error;

/// Result type alias using itrack's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for itrack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record absent or not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Pipeline operation violates a precondition; terminal for the request
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Duplicate value for a unique field
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("Application not found.".to_string());
        assert_eq!(err.to_string(), "Not found: Application not found.");
    }

    #[test]
    fn test_error_display_invalid_state() {
        let err = Error::InvalidState("No more stages.".to_string());
        assert_eq!(err.to_string(), "Invalid state: No more stages.");
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("email taken".to_string());
        assert_eq!(err.to_string(), "Conflict: email taken");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("JWT_SECRET is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: JWT_SECRET is not set"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(ref msg) if !msg.is_empty()));
    }

    #[test]
    fn test_from_sqlx_error() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
