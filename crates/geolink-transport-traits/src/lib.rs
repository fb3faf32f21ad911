//! # geolink Transport Traits
//!
//! The transport contract used by the geolink feature-service client.
//! This crate provides the abstractions that every transport implementation depends on.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Traits**: [`Transport`]
//! - **Requests**: [`ServiceRequest`], [`HttpMethod`]
//! - **Errors**: [`TransportError`], [`TransportResult`]
//! - **Config**: [`LimitsConfig`], [`TimeoutConfig`]
//! - **Metrics**: [`TransportMetrics`], [`AtomicMetrics`]
//!
//! ## Usage
//!
//! A transport takes a fully composed request and resolves to the decoded JSON
//! body, or to a [`TransportError`]. It knows nothing about sessions, tokens or
//! feature classes:
//!
//! ```rust,ignore
//! use geolink_transport_traits::{ServiceRequest, Transport, TransportResult};
//! use std::future::Future;
//! use std::pin::Pin;
//!
//! #[derive(Debug)]
//! struct MyTransport { /* ... */ }
//!
//! impl Transport for MyTransport {
//!     fn send(
//!         &self,
//!         request: ServiceRequest,
//!     ) -> Pin<Box<dyn Future<Output = TransportResult<serde_json::Value>> + Send + '_>> {
//!         Box::pin(async move { /* ... */ })
//!     }
//!     // ... metrics()
//! }
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
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod config;
mod error;
mod metrics;
mod request;
mod traits;

// Re-export all public items
pub use config::{LimitsConfig, TimeoutConfig};
pub use error::{TransportError, TransportResult};
pub use metrics::{AtomicMetrics, TransportMetrics};
pub use request::{FORM_CONTENT_TYPE, HttpMethod, ServiceRequest};
pub use traits::Transport;
