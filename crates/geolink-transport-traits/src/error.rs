//! Transport error types.

use std::time::Duration;
use thiserror::Error;

/// Result of a transport operation.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Why a request produced no usable JSON body.
///
/// Service-level errors reported inside a 200 body are not transport errors;
/// the transport hands those bodies up unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TransportError {
    /// The endpoint could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Request URL
        url: String,
    },

    /// The body was not JSON
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// No answer within the configured request timeout
    #[error("No response from {url} within {timeout:?}")]
    RequestTimeout {
        /// Request URL
        url: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The transport or the request it was given is unusable
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),

    /// Form body over `LimitsConfig::max_request_size`
    #[error("Request body of {size} bytes exceeds the {max} byte limit")]
    RequestTooLarge {
        /// Body size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Response body over `LimitsConfig::max_response_size`
    #[error("Response body of {size} bytes exceeds the {max} byte limit")]
    ResponseTooLarge {
        /// Body size
        size: usize,
        /// Configured limit
        max: usize,
    },
}

impl TransportError {
    /// The request never got a response.
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::RequestTimeout { .. }
        )
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationFailed(err.to_string())
    }
}
