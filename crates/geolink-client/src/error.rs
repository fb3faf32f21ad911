//! Error types for the feature-service client.

use geolink_transport_traits::TransportError;
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for key-value store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for geometry conversion
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Errors surfaced by [`ServiceClient`](crate::ServiceClient) and the session layer
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// The transport could not deliver the request or decode the answer
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Geometry could not be converted
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// The service answered with an `{"error": ...}` body
    #[error("Service error [{code}]: {message}")]
    Service {
        /// Error code reported by the service
        code: i64,
        /// Human readable message
        message: String,
        /// Additional detail lines
        details: Vec<String>,
    },

    /// The response was JSON but not of the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Client configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller supplied input that cannot be sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Build a [`ClientError::Service`] from an `{"code", "message", "details"}` object.
    pub(crate) fn from_service_error(error: &serde_json::Value) -> Self {
        let code = error.get("code").and_then(serde_json::Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Unknown service error")
            .to_string();
        let details = match error.get("details") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        };
        Self::Service {
            code,
            message,
            details,
        }
    }

    /// True if the failure happened below the service (network, timeout, HTTP status)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors from a [`KeyValueStore`](crate::KeyValueStore)
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// Reading or writing the backing medium failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the geometry codec
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GeometryError {
    /// The geometry kind has no native counterpart in this codec
    #[error("Unsupported geometry type: {0}")]
    Unsupported(String),

    /// The geometry is structurally invalid
    #[error("Invalid geometry: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_error_from_body() {
        let err = ClientError::from_service_error(&json!({
            "code": 498,
            "message": "Invalid token.",
            "details": ["Token expired"]
        }));
        match err {
            ClientError::Service {
                code,
                message,
                details,
            } => {
                assert_eq!(code, 498);
                assert_eq!(message, "Invalid token.");
                assert_eq!(details, vec!["Token expired".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_service_error_defaults() {
        let err = ClientError::from_service_error(&json!({}));
        assert_eq!(err.to_string(), "Service error [0]: Unknown service error");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_conversion() {
        let err: ClientError = TransportError::ConnectionFailed("refused".to_string()).into();
        assert!(err.is_transport());
    }
}
