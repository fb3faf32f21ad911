//! The service client: every public operation against the feature service.
//!
//! Each operation follows the same path:
//! 1. the session supplies a token (or none, for anonymous access)
//! 2. base parameters (`f=json`, `token`) are merged with the operation's own
//! 3. the route is composed against the active base URL
//! 4. the transport dispatches a form POST
//! 5. the JSON answer is checked for a service error and shaped

mod builder;
mod edit;
mod query;

pub use builder::ServiceClientBuilder;
pub use edit::prepare_feature_for_submission;
pub use query::{FeatureRecord, QueryOptions};

use geolink_transport_traits::{ServiceRequest, Transport, TransportMetrics};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::ClientConfig;
use crate::edits::FeatureClassId;
use crate::error::{ClientError, ClientResult};
use crate::geometry::GeometryCodec;
use crate::metadata::{FeatureClassMetadata, MetadataCache, ServiceMetadata};
use crate::params::{QueryParams, compose_full_url, compose_query, compose_route, merge_params};
use crate::session::{Session, SessionManager};

/// Route root for read operations
pub(crate) const MAP_SERVER: &str = "MapServer";
/// Route root for edit operations and authenticated reads
pub(crate) const FEATURE_SERVER: &str = "FeatureServer";

/// Session-aware client for one feature service
///
/// Hold a single instance for the lifetime of the application; it owns the
/// session and the metadata caches.
#[derive(Debug)]
pub struct ServiceClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: SessionManager,
    metadata: MetadataCache,
    codec: GeometryCodec,
}

impl ServiceClient {
    /// Start configuring a client
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::new()
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session manager
    pub fn session_manager(&self) -> &SessionManager {
        &self.session
    }

    /// The geometry codec
    pub fn codec(&self) -> &GeometryCodec {
        &self.codec
    }

    /// Transport counters
    pub fn metrics(&self) -> TransportMetrics {
        self.transport.metrics()
    }

    // ============================================================================
    // SESSION
    // ============================================================================

    /// Set credentials and acquire a token; `false` if they were rejected
    ///
    /// # Errors
    ///
    /// Transport failures and unexpected token responses.
    pub async fn authenticate(
        &self,
        username: impl Into<String>,
        password: SecretString,
    ) -> ClientResult<bool> {
        self.session.authenticate(username, password).await
    }

    /// Reset the session to defaults
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the reset cannot be persisted.
    pub async fn logout(&self) -> ClientResult<()> {
        self.session.logout().await
    }

    /// Snapshot of the session
    pub async fn session(&self) -> Session {
        self.session.session().await
    }

    /// Replace the session wholesale
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the session cannot be persisted.
    pub async fn restore(&self, session: Session) -> ClientResult<()> {
        self.session.restore(session).await
    }

    /// Base URL requests go to right now
    ///
    /// The editable root while authenticated (when configured), the read-only
    /// root otherwise.
    pub async fn current_base_url(&self) -> &str {
        match &self.config.editable_service_url {
            Some(editable) if self.session.is_authenticated().await => editable,
            _ => &self.config.service_url,
        }
    }

    /// `f=json` plus the current token, if any
    ///
    /// # Errors
    ///
    /// Propagates token acquisition failures.
    pub async fn base_params(&self) -> ClientResult<QueryParams> {
        let mut params = QueryParams::new();
        params.insert("f".to_string(), Value::from("json"));
        if let Some(token) = self.session.token().await? {
            params.insert("token".to_string(), Value::from(token));
        }
        Ok(params)
    }

    /// GET-style URL for `segments` with base and extra parameters
    ///
    /// # Errors
    ///
    /// Propagates token acquisition failures.
    pub async fn full_url<S: AsRef<str>>(
        &self,
        segments: &[S],
        extra: QueryParams,
    ) -> ClientResult<String> {
        let params = merge_params(self.base_params().await?, extra);
        Ok(compose_full_url(self.current_base_url().await, segments, &params))
    }

    // ============================================================================
    // METADATA
    // ============================================================================

    /// Uncached service descriptor (`MapServer`)
    ///
    /// # Errors
    ///
    /// Transport and service errors.
    pub async fn feature_classes(&self) -> ClientResult<Value> {
        self.request(&[MAP_SERVER], QueryParams::new()).await
    }

    /// Service descriptor, fetched once
    ///
    /// # Errors
    ///
    /// Transport and service errors, or [`ClientError::MalformedResponse`].
    pub async fn service_metadata(&self) -> ClientResult<Arc<ServiceMetadata>> {
        self.metadata
            .service(|| async {
                let value = self.request(&[MAP_SERVER], QueryParams::new()).await?;
                serde_json::from_value(value).map_err(|e| {
                    ClientError::MalformedResponse(format!("service metadata: {e}"))
                })
            })
            .await
    }

    /// Feature class descriptor, fetched once per id
    ///
    /// # Errors
    ///
    /// Transport and service errors, or [`ClientError::MalformedResponse`].
    pub async fn feature_class_details(
        &self,
        id: &FeatureClassId,
    ) -> ClientResult<Arc<FeatureClassMetadata>> {
        self.metadata
            .feature_class(id, || async {
                let value = self
                    .request(&[MAP_SERVER, id.as_str()], QueryParams::new())
                    .await?;
                serde_json::from_value(value).map_err(|e| {
                    ClientError::MalformedResponse(format!("feature class {id} metadata: {e}"))
                })
            })
            .await
    }

    /// Legend of every layer (`MapServer/legend`)
    ///
    /// # Errors
    ///
    /// Transport and service errors.
    pub async fn legend(&self) -> ClientResult<Value> {
        self.request(&[MAP_SERVER, "legend"], QueryParams::new()).await
    }

    // ============================================================================
    // DISPATCH
    // ============================================================================

    /// Merge base parameters with `extra` and POST to `segments`
    pub(crate) async fn request(&self, segments: &[&str], extra: QueryParams) -> ClientResult<Value> {
        let params = merge_params(self.base_params().await?, extra);
        self.dispatch(segments, &params).await
    }

    /// POST an already complete parameter set to `segments`
    pub(crate) async fn dispatch(&self, segments: &[&str], params: &QueryParams) -> ClientResult<Value> {
        let route = compose_route(segments);
        let url = format!("{}{}", self.current_base_url().await, route);
        debug!(route = %route, authenticated = params.contains_key("token"), "Dispatching service request");

        let response = self
            .transport
            .send(ServiceRequest::form_post(url, compose_query(params)))
            .await?;

        if let Some(error) = response.get("error") {
            let err = ClientError::from_service_error(error);
            debug!(route = %route, error = %err, "Service reported an error");
            return Err(err);
        }
        Ok(response)
    }
}
