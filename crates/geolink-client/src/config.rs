//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::params::normalize_base_url;

/// Endpoint and behavior settings for a [`ServiceClient`](crate::ServiceClient).
///
/// Base URLs are stored with a trailing `/`; use the setters or
/// [`ClientConfig::normalized`] to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Read-only service root, e.g. `https://host/arcgis/rest/services/Cities/`
    pub service_url: String,

    /// Editable service root used while authenticated
    pub editable_service_url: Option<String>,

    /// Token endpoint, e.g. `https://host/arcgis/tokens/generateToken`
    pub token_url: Option<String>,

    /// Name of the key-value store holding the session
    pub store_name: String,

    /// Key the session is stored under
    pub session_key: String,

    /// Attribute that carries converted geometry on returned records
    pub shape_attribute: String,

    /// Attribute used as the feature id when converting GeoJSON features
    pub id_attribute: String,

    /// Shift negative longitudes of query filter geometry into 0..360
    pub unrectify_filter_geometry: bool,

    /// Treat an update response without a matching result block as failure
    pub strict_update_results: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: String::new(),
            editable_service_url: None,
            token_url: None,
            store_name: "continuum".to_string(),
            session_key: "userInfo".to_string(),
            shape_attribute: "SHAPE".to_string(),
            id_attribute: "OBJECTID".to_string(),
            unrectify_filter_geometry: true,
            strict_update_results: false,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a read-only service root
    pub fn new(service_url: impl AsRef<str>) -> Self {
        let mut config = Self::default();
        config.set_service_url(service_url);
        config
    }

    /// Set the read-only service root, appending `/` if missing
    pub fn set_service_url(&mut self, url: impl AsRef<str>) {
        self.service_url = normalize_base_url(url.as_ref());
    }

    /// Set the editable service root, appending `/` if missing
    pub fn set_editable_service_url(&mut self, url: impl AsRef<str>) {
        self.editable_service_url = Some(normalize_base_url(url.as_ref()));
    }

    /// Return a copy with both base URLs normalized
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.service_url.is_empty() {
            self.service_url = normalize_base_url(&self.service_url);
        }
        if let Some(url) = self.editable_service_url.take() {
            self.editable_service_url = Some(normalize_base_url(&url));
        }
        self
    }

    /// Check that the configuration can drive a client
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] when the service URL is missing or
    /// not an http(s) URL, or when a reserved attribute name is empty.
    pub fn validate(&self) -> ClientResult<()> {
        if self.service_url.is_empty() {
            return Err(ClientError::InvalidConfig(
                "service_url is required".to_string(),
            ));
        }
        let urls = std::iter::once(&self.service_url)
            .chain(self.editable_service_url.iter())
            .chain(self.token_url.iter());
        for url in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ClientError::InvalidConfig(format!(
                    "not an http(s) URL: {url}"
                )));
            }
        }
        if self.session_key.is_empty() || self.shape_attribute.is_empty() {
            return Err(ClientError::InvalidConfig(
                "session_key and shape_attribute must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
