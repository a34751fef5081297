//! Error types for the FireKey import core.

use thiserror::Error;

/// Errors that can occur while staging an import or assembling an export.
///
/// None of these are fatal: every variant leaves the staging workflow in a
/// state the user can recover from by retrying, going back, or resetting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Transport or connectivity failure, including timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// The remote service rejected the session (HTTP 401)
    #[error("Unauthorized")]
    Unauthorized,

    /// File unparseable or without usable rows
    #[error("Format error: {0}")]
    Format(String),

    /// Missing or inconsistent user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other non-2xx response from the remote service
    #[error("Server error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Server { status: Option<u16>, message: String },

    /// The request was cancelled before it completed
    #[error("Request cancelled")]
    Cancelled,

    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    Json(String),
}

impl ImportError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        ImportError::Server {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether the upload/preview path should recover from this error by
    /// switching to local parsing.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(self, ImportError::Network(_) | ImportError::Server { .. })
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Json(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Format(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ImportError::Server {
                status: err.status().map(|s| s.as_u16()),
                message: format!("Malformed response: {}", err),
            };
        }
        if let Some(status) = err.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return ImportError::Unauthorized;
            }
            return ImportError::server(status.as_u16(), err.to_string());
        }
        // Timeouts, connect failures and request construction errors
        ImportError::Network(err.to_string())
    }
}

/// Result type alias for import/export operations.
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_classification() {
        assert!(ImportError::Network("down".into()).is_recoverable_by_fallback());
        assert!(ImportError::server(500, "boom").is_recoverable_by_fallback());
        assert!(!ImportError::Unauthorized.is_recoverable_by_fallback());
        assert!(!ImportError::Cancelled.is_recoverable_by_fallback());
        assert!(!ImportError::Format("empty".into()).is_recoverable_by_fallback());
        assert!(!ImportError::Validation("password".into()).is_recoverable_by_fallback());
    }

    #[test]
    fn test_server_error_display() {
        assert_eq!(
            ImportError::server(502, "bad gateway").to_string(),
            "Server error (502): bad gateway"
        );
        let no_status = ImportError::Server {
            status: None,
            message: "odd".to_string(),
        };
        assert_eq!(no_status.to_string(), "Server error: odd");
    }
}
