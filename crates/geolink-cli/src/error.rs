//! Error types for CLI operations

use geolink_client::ClientError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Client, transport or service failure
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The service rejected the login
    #[error("Login rejected for user '{0}'")]
    LoginRejected(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CliError {
    /// Hints for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Client(ClientError::InvalidConfig(_)) => vec![
                "Pass --url or set GEOLINK_SERVICE_URL",
                "Or point --config at a file with service_url",
            ],
            Self::Client(err) if err.is_transport() => vec![
                "Check the service URL",
                "Verify network connectivity",
                "Increase the timeout with --timeout",
            ],
            Self::Client(ClientError::Service { code: 498 | 499, .. }) => {
                vec!["Run `geolink login` again"]
            }
            Self::LoginRejected(_) => vec![
                "Check the user name and password",
                "Pass --token-url if the token endpoint is not the default",
            ],
            Self::InvalidArguments(_) => vec!["Use --help to see the expected format"],
            _ => vec![],
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
