//! Size and time bounds a transport enforces on every request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{TransportError, TransportResult};

const MIB: usize = 1024 * 1024;

/// Body size bounds, in bytes; `None` disables a bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted response body
    pub max_response_size: Option<usize>,

    /// Largest form body the transport will send
    pub max_request_size: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            // A page of polygon features easily runs to tens of megabytes
            max_response_size: Some(32 * MIB),
            max_request_size: Some(4 * MIB),
        }
    }
}

impl LimitsConfig {
    /// No bounds at all
    pub const NONE: Self = Self {
        max_response_size: None,
        max_request_size: None,
    };

    /// Reject a request body larger than `max_request_size`.
    pub fn check_request(&self, size: usize) -> TransportResult<()> {
        match self.max_request_size {
            Some(max) if size > max => Err(TransportError::RequestTooLarge { size, max }),
            _ => Ok(()),
        }
    }

    /// Reject a response body larger than `max_response_size`.
    pub fn check_response(&self, size: usize) -> TransportResult<()> {
        match self.max_response_size {
            Some(max) if size > max => Err(TransportError::ResponseTooLarge { size, max }),
            _ => Ok(()),
        }
    }
}

/// Connect and per-request timeouts.
///
/// The client core never times a request out itself; the transport owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment
    pub connect: Duration,

    /// Whole request, `None` for no limit
    pub request: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Some(Duration::from_secs(60)),
        }
    }
}

impl TimeoutConfig {
    /// Same connect timeout, different request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request = Some(timeout);
        self
    }

    /// Let requests run as long as the service takes
    #[must_use]
    pub const fn without_request_timeout(mut self) -> Self {
        self.request = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = LimitsConfig::default();
        assert!(limits.check_request(MIB).is_ok());
        assert!(matches!(
            limits.check_request(10 * MIB),
            Err(TransportError::RequestTooLarge { max, .. }) if max == 4 * MIB
        ));
        assert!(limits.check_response(32 * MIB).is_ok());
        assert!(limits.check_response(32 * MIB + 1).is_err());
    }

    #[test]
    fn test_no_limits() {
        assert!(LimitsConfig::NONE.check_request(usize::MAX).is_ok());
        assert!(LimitsConfig::NONE.check_response(usize::MAX).is_ok());
    }

    #[test]
    fn test_limits_partial_deserialize() {
        let limits: LimitsConfig = serde_json::from_str(r#"{"max_request_size": 10}"#).unwrap();
        assert_eq!(limits.max_request_size, Some(10));
        assert_eq!(limits.max_response_size, Some(32 * MIB));
    }

    #[test]
    fn test_timeout_adjustments() {
        let timeout = TimeoutConfig::default().with_request_timeout(Duration::from_secs(5));
        assert_eq!(timeout.connect, Duration::from_secs(10));
        assert_eq!(timeout.request, Some(Duration::from_secs(5)));
        assert_eq!(timeout.without_request_timeout().request, None);
    }
}
