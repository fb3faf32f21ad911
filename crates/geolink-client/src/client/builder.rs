//! Builder for [`ServiceClient`].

use geolink_http::{HttpTransport, HttpTransportConfig};
use geolink_transport_traits::Transport;
use std::sync::Arc;

use super::ServiceClient;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::geometry::{GeometryCodec, GeometryConverter};
use crate::metadata::MetadataCache;
use crate::session::SessionManager;
use crate::store::{KeyValueStore, MemoryStore};

/// Builder for configuring and creating a [`ServiceClient`]
///
/// Without an explicit transport an [`HttpTransport`] is created from the
/// HTTP settings; without a store the session lives in memory only.
///
/// # Examples
///
/// ```rust,no_run
/// use geolink_client::{JsonFileStore, ServiceClient};
/// use std::sync::Arc;
///
/// # async fn example() -> geolink_client::ClientResult<()> {
/// let client = ServiceClient::builder()
///     .with_service_url("https://host/arcgis/rest/services/Cities")
///     .with_editable_service_url("https://host/arcgis/rest/services/CitiesEdit")
///     .with_token_url("https://host/arcgis/tokens/generateToken")
///     .with_store(Arc::new(JsonFileStore::new("/var/lib/geolink", "continuum")))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ServiceClientBuilder {
    config: ClientConfig,
    http_config: HttpTransportConfig,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn KeyValueStore>>,
    converter: Option<Arc<dyn GeometryConverter>>,
}

impl ServiceClientBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole client configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config.normalized();
        self
    }

    /// Read-only service root
    pub fn with_service_url(mut self, url: impl AsRef<str>) -> Self {
        self.config.set_service_url(url);
        self
    }

    /// Editable service root used while authenticated
    pub fn with_editable_service_url(mut self, url: impl AsRef<str>) -> Self {
        self.config.set_editable_service_url(url);
        self
    }

    /// Token endpoint
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.config.token_url = Some(url.into());
        self
    }

    /// Treat update responses without results as failures
    pub fn with_strict_update_results(mut self, strict: bool) -> Self {
        self.config.strict_update_results = strict;
        self
    }

    /// Settings for the default HTTP transport
    pub fn with_http_config(mut self, config: HttpTransportConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Use a specific transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Persist the session in `store`
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a specific geometry converter
    pub fn with_converter(mut self, converter: Arc<dyn GeometryConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Validate the configuration, restore the persisted session and build
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`](crate::ClientError::InvalidConfig)
    /// for unusable configuration, a transport error if the HTTP client cannot
    /// be created, or a store error if the session cannot be read.
    pub async fn build(self) -> ClientResult<ServiceClient> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.http_config)?),
        };
        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let codec = self
            .converter
            .map(GeometryCodec::new)
            .unwrap_or_default();

        let session = SessionManager::load(
            Arc::clone(&transport),
            store,
            config.token_url.clone(),
            config.session_key.clone(),
        )
        .await?;

        tracing::info!(
            service_url = %config.service_url,
            transport = transport.name(),
            "Service client ready"
        );

        Ok(ServiceClient {
            config,
            transport,
            session,
            metadata: MetadataCache::new(),
            codec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[tokio::test]
    async fn test_build_requires_service_url() {
        let err = ServiceClientBuilder::new().build().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_build_normalizes_urls() {
        let client = ServiceClient::builder()
            .with_service_url("https://host/svc")
            .with_editable_service_url("https://host/edit")
            .with_strict_update_results(true)
            .build()
            .await
            .unwrap();

        assert_eq!(client.config().service_url, "https://host/svc/");
        assert_eq!(
            client.config().editable_service_url.as_deref(),
            Some("https://host/edit/")
        );
        assert!(client.config().strict_update_results);
        assert_eq!(client.current_base_url().await, "https://host/svc/");
    }

    #[tokio::test]
    async fn test_with_config_normalizes() {
        let client = ServiceClient::builder()
            .with_config(ClientConfig {
                service_url: "http://host/svc".to_string(),
                ..Default::default()
            })
            .build()
            .await
            .unwrap();
        assert_eq!(client.config().service_url, "http://host/svc/");
    }
}
