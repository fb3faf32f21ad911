//! # geolink HTTP Transport
//!
//! HTTP transport for the geolink feature-service client, built on `reqwest`.
//!
//! ## Features
//!
//! - **Form-encoded POST**: the body composed by the client is sent untouched
//! - **JSON decoding**: any 2xx body is decoded as JSON; anything else is a failure
//! - **Timeouts**: connect and per-request timeouts from [`TimeoutConfig`]
//! - **Size Limits**: configurable request/response size validation
//! - **Metrics**: lock-free request/byte/latency counters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use geolink_http::{HttpTransport, HttpTransportConfig};
//! use geolink_transport_traits::{ServiceRequest, Transport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(HttpTransportConfig::default())?;
//!
//!     let metadata = transport
//!         .send(ServiceRequest::form_post(
//!             "https://example.com/arcgis/rest/services/Cities/MapServer",
//!             "f=json",
//!         ))
//!         .await?;
//!
//!     println!("{metadata}");
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration Options
//!
//! ```rust
//! use geolink_http::HttpTransportConfig;
//! use geolink_transport_traits::{LimitsConfig, TimeoutConfig};
//! use std::time::Duration;
//!
//! let config = HttpTransportConfig {
//!     timeout: TimeoutConfig::default().with_request_timeout(Duration::from_secs(300)),
//!     limits: LimitsConfig::NONE,
//!     user_agent: None,
//!     ..Default::default()
//! };
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod transport;

// Re-export the transport implementation
pub use transport::{HttpTransport, HttpTransportConfig};

// Re-export common types from traits crate for convenience
pub use geolink_transport_traits::{
    LimitsConfig, ServiceRequest, TimeoutConfig, Transport, TransportError, TransportMetrics,
    TransportResult,
};
