//! # Standardized Error Types
//!
//! Error type for the ambient layer of the pipeline (logging setup, file
//! sinks, report output). Dependency failures never surface as this type;
//! they are folded into a [`crate::FailSoftResult`] instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A type alias for Result with the error type defaulting to our Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categorizes different kinds of errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Initialization or configuration error
    Initialization,
    /// Invalid or inconsistent configuration
    Configuration,
    /// Error in data serialization or parsing
    Serialization,
    /// Input/output error
    IO,
    /// External service or API error
    External,
    /// Unexpected or unhandled error
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Initialization => write!(f, "Initialization Error"),
            ErrorKind::Configuration => write!(f, "Configuration Error"),
            ErrorKind::Serialization => write!(f, "Serialization Error"),
            ErrorKind::IO => write!(f, "I/O Error"),
            ErrorKind::External => write!(f, "External Service Error"),
            ErrorKind::Unexpected => write!(f, "Unexpected Error"),
        }
    }
}

/// Core error type
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    /// A unique identifier for this error instance
    pub id: Uuid,
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Detailed error message
    pub message: String,
    /// The time when the error occurred
    pub timestamp: DateTime<Utc>,
    /// The component where the error originated
    pub service: Option<String>,
}

impl Error {
    /// Creates a new error with the specified kind and message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            service: None,
        }
    }

    pub fn with_service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::IO, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::Serialization, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::configuration("suite file missing").with_service("test-runner");
        assert_eq!(err.to_string(), "Configuration Error: suite file missing");
        assert_eq!(err.service.as_deref(), Some("test-runner"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let err: Error = io.into();
        assert_eq!(err.kind, ErrorKind::IO);
    }
}
