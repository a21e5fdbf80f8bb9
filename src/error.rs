use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::room::ClientId;

/// Main error type for the murmur chat relay
#[derive(Debug)]
pub enum MurmurError {
    /// Missing or empty required input (client id, message text, ...)
    Validation(String),

    /// Join requested for a client already in the room
    AlreadyMember(ClientId),

    /// Operation requires membership the client does not have
    NotMember(ClientId),

    /// History snapshot missed its deadline
    Timeout(String),

    /// Rate limiter refused the call
    AdmissionDenied(ClientId),

    /// Registry has begun shutting down and accepts no new work
    ShuttingDown,

    /// Nothing matched a lookup that expects results
    NotFound(String),

    /// Configuration or CLI argument errors
    Config(String),

    /// Unexpected failures: poisoned locks, closed channels
    Internal(String),

    /// System I/O errors
    Io(std::io::Error),

    /// JSON serialization/deserialization errors
    Serialization(serde_json::Error),
}

impl fmt::Display for MurmurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MurmurError::Validation(msg) => write!(f, "Validation error: {}", msg),
            MurmurError::AlreadyMember(id) => {
                write!(f, "Client {} already exists in the room", id)
            }
            MurmurError::NotMember(id) => write!(f, "Client {} does not exist", id),
            MurmurError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            MurmurError::AdmissionDenied(id) => write!(f, "Too many requests from {}", id),
            MurmurError::ShuttingDown => write!(f, "Chat room is shutting down"),
            MurmurError::NotFound(msg) => write!(f, "Not found: {}", msg),
            MurmurError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MurmurError::Internal(msg) => write!(f, "Internal error: {}", msg),
            MurmurError::Io(err) => write!(f, "I/O error: {}", err),
            MurmurError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for MurmurError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MurmurError::Io(err) => Some(err),
            MurmurError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, MurmurError>;

impl IntoResponse for MurmurError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.user_message(),
                "type": self.error_type(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl MurmurError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            MurmurError::Validation(_) => StatusCode::BAD_REQUEST,
            MurmurError::AlreadyMember(_) => StatusCode::CONFLICT,
            MurmurError::NotMember(_) => StatusCode::NOT_FOUND,
            MurmurError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            MurmurError::AdmissionDenied(_) => StatusCode::TOO_MANY_REQUESTS,
            MurmurError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            MurmurError::NotFound(_) => StatusCode::NOT_FOUND,
            MurmurError::Config(_) => StatusCode::BAD_REQUEST,
            MurmurError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MurmurError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MurmurError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            MurmurError::Validation(msg) => msg.clone(),
            MurmurError::AlreadyMember(id) => {
                format!("Client {} already exists in the room.", id)
            }
            MurmurError::NotMember(id) => format!("Client {} does not exist.", id),
            MurmurError::Timeout(_) => "Request timed out.".to_string(),
            MurmurError::AdmissionDenied(_) => "Too many requests".to_string(),
            MurmurError::ShuttingDown => {
                "Service is shutting down. Please try again later.".to_string()
            }
            MurmurError::NotFound(msg) => msg.clone(),
            MurmurError::Config(msg) => format!("Configuration error: {}", msg),
            MurmurError::Internal(_) | MurmurError::Io(_) | MurmurError::Serialization(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            MurmurError::Validation(_) => "validation_error",
            MurmurError::AlreadyMember(_) => "already_member",
            MurmurError::NotMember(_) => "not_member",
            MurmurError::Timeout(_) => "request_timeout",
            MurmurError::AdmissionDenied(_) => "admission_denied",
            MurmurError::ShuttingDown => "shutting_down",
            MurmurError::NotFound(_) => "not_found",
            MurmurError::Config(_) => "configuration_error",
            MurmurError::Internal(_) => "internal_error",
            MurmurError::Io(_) => "io_error",
            MurmurError::Serialization(_) => "serialization_error",
        }
    }

    /// Domain refusals are ordinary outcomes and should not be logged as failures
    pub fn is_domain_outcome(&self) -> bool {
        matches!(
            self,
            MurmurError::AlreadyMember(_)
                | MurmurError::NotMember(_)
                | MurmurError::AdmissionDenied(_)
                | MurmurError::Validation(_)
        )
    }

    /// Whether the caller may retry the same call unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, MurmurError::Timeout(_))
    }
}

// Conversions from common error types
impl From<std::io::Error> for MurmurError {
    fn from(err: std::io::Error) -> Self {
        MurmurError::Io(err)
    }
}

impl From<serde_json::Error> for MurmurError {
    fn from(err: serde_json::Error) -> Self {
        MurmurError::Serialization(err)
    }
}

impl From<tokio::time::error::Elapsed> for MurmurError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        MurmurError::Timeout(err.to_string())
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Validation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Internal(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = MurmurError::Config("Invalid port".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: Invalid port");

        let err = MurmurError::NotMember(ClientId::from("alice"));
        assert_eq!(err.to_string(), "Client alice does not exist");

        let io_err = MurmurError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        assert!(io_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_status_codes() {
        let bob = ClientId::from("bob");
        assert_eq!(
            MurmurError::AlreadyMember(bob.clone()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            MurmurError::NotMember(bob.clone()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MurmurError::AdmissionDenied(bob).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            MurmurError::Timeout("history".into()).status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            MurmurError::ShuttingDown.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let murmur_err: MurmurError = io_err.into();
        assert!(matches!(murmur_err, MurmurError::Io(_)));
    }

    #[test]
    fn test_classification() {
        assert!(MurmurError::NotMember(ClientId::from("x")).is_domain_outcome());
        assert!(!MurmurError::Internal("boom".into()).is_domain_outcome());
        assert!(MurmurError::Timeout("history".into()).is_retryable());
        assert!(!MurmurError::ShuttingDown.is_retryable());
    }

    #[test]
    fn test_macros() {
        let err = config_error!("Port {} is invalid", 65536);
        assert_eq!(
            err.to_string(),
            "Configuration error: Port 65536 is invalid"
        );

        let err = validation_error!("Client ID is required.");
        assert_eq!(err.to_string(), "Validation error: Client ID is required.");

        let err = internal_error!("lock poisoned");
        assert_eq!(err.to_string(), "Internal error: lock poisoned");
    }
}
