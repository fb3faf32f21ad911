//! # geolink Client
//!
//! Session-aware client for ArcGIS-style feature services.
//!
//! ## Features
//!
//! - **Session lifecycle**: token acquisition, expiry and reset on rejected
//!   credentials, persisted through a [`KeyValueStore`]
//! - **Endpoint selection**: editable service root while authenticated,
//!   read-only root otherwise
//! - **Request composition**: routes and form-encoded parameter sets
//! - **Geometry codec**: GeoJSON in and out, native geometry on the wire, with
//!   longitude rectification at the antimeridian
//! - **Metadata cache**: feature class and service descriptors fetched once,
//!   with concurrent lookups sharing one request
//! - **Edit interpretation**: `applyEdits` responses reduced to plain outcomes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use geolink_client::{FeatureClassId, QueryOptions, ServiceClient};
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ServiceClient::builder()
//!         .with_service_url("https://host/arcgis/rest/services/Utilities")
//!         .with_editable_service_url("https://host/arcgis/rest/services/UtilitiesEdit")
//!         .with_token_url("https://host/arcgis/tokens/generateToken")
//!         .build()
//!         .await?;
//!
//!     client
//!         .authenticate("editor", SecretString::new("secret".to_string()))
//!         .await?;
//!
//!     let hydrants = FeatureClassId::from(3);
//!     let records = client
//!         .query(&hydrants, &QueryOptions::new().with_where("STATUS = 'ACTIVE'"))
//!         .await?;
//!     println!("{} active hydrants", records.len());
//!     Ok(())
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

mod client;
pub mod config;
pub mod edits;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod params;
pub mod session;
pub mod store;

pub use client::{
    FeatureRecord, QueryOptions, ServiceClient, ServiceClientBuilder,
    prepare_feature_for_submission,
};
pub use config::ClientConfig;
pub use edits::{
    EditBatch, EditOperation, EditOutcome, EditResultBlock, FeatureClassId, UpdateOutcome,
    check_delete_success, check_insert_success, check_update_success, not_all_blank,
    update_outcome,
};
pub use error::{ClientError, ClientResult, GeometryError, StoreError};
pub use geometry::{GeometryCodec, GeometryConverter, GeometryType, NativeGeometry};
pub use metadata::{FeatureClassMetadata, FieldInfo, FieldType, ServiceMetadata};
pub use params::{QueryParams, compose_full_url, compose_query, compose_route};
pub use session::{Session, SessionManager};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

// Re-export transport types callers need to plug in their own transport
pub use geolink_transport_traits::{ServiceRequest, Transport, TransportError};
