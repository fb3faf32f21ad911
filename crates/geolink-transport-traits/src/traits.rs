//! Core transport trait.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::error::TransportResult;
use crate::metrics::TransportMetrics;
use crate::request::ServiceRequest;

/// The contract every transport implements: send a request, get JSON or a failure.
///
/// A transport resolves to the decoded body for any 2xx response and to a
/// [`TransportError`](crate::TransportError) otherwise. Application-level error
/// bodies (a 200 carrying `{"error": ...}`) are returned as ordinary JSON; the
/// caller decides what they mean.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Dispatches a single request and decodes the JSON response body.
    fn send(
        &self,
        request: ServiceRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Value>> + Send + '_>>;

    /// Returns a snapshot of the transport's counters.
    fn metrics(&self) -> TransportMetrics {
        TransportMetrics::default()
    }

    /// Returns a short name for log output.
    fn name(&self) -> &'static str {
        "transport"
    }
}
