//! reqwest-backed implementation of the geolink [`Transport`] contract.
//!
//! The feature service is driven entirely with form-encoded POSTs (and the
//! occasional GET), answered with JSON. This transport:
//! - enforces request/response size limits
//! - maps network failures, timeouts and non-2xx statuses to [`TransportError`]
//! - decodes the body as JSON and nothing more
//! - keeps lock-free request counters

use reqwest::{Client as HttpClient, header};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use geolink_transport_traits::{
    AtomicMetrics, HttpMethod, LimitsConfig, ServiceRequest, TimeoutConfig, Transport,
    TransportError, TransportMetrics, TransportResult,
};

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Connect and request timeouts
    pub timeout: TimeoutConfig,

    /// Size limits for requests and responses
    pub limits: LimitsConfig,

    /// User agent string (set to None to disable User-Agent header)
    ///
    /// Default: `geolink/{version}`
    pub user_agent: Option<String>,

    /// Custom headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            user_agent: Some(format!("geolink/{}", env!("CARGO_PKG_VERSION"))),
            headers: HashMap::new(),
        }
    }
}

/// HTTP transport over a shared `reqwest` connection pool.
pub struct HttpTransport {
    config: HttpTransportConfig,
    http_client: HttpClient,
    metrics: Arc<AtomicMetrics>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("timeout", &self.config.timeout)
            .field("limits", &self.config.limits)
            .finish()
    }
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConfigurationError`] if the underlying client
    /// cannot be built (for example, an unusable TLS backend).
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        // Must explicitly call use_rustls_tls() because cargo features are additive
        // and other dependencies may bring in native-tls.
        let mut client_builder = HttpClient::builder()
            .use_rustls_tls()
            .connect_timeout(config.timeout.connect);

        if let Some(request_timeout) = config.timeout.request {
            client_builder = client_builder.timeout(request_timeout);
        }

        if let Some(ref user_agent) = config.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        }

        let http_client = client_builder
            .build()
            .map_err(|e| TransportError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            metrics: Arc::new(AtomicMetrics::new()),
        })
    }

    /// Create a transport with default settings
    pub fn with_defaults() -> TransportResult<Self> {
        Self::new(HttpTransportConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Build request headers
    fn build_headers(&self, request: &ServiceRequest) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();

        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        if let Some(content_type) = &request.content_type
            && let Ok(value) = header::HeaderValue::from_str(content_type)
        {
            headers.insert(header::CONTENT_TYPE, value);
        }

        // Skip invalid headers rather than fail the request
        for (key, value) in self.config.headers.iter().chain(request.headers.iter()) {
            if let (Ok(k), Ok(v)) = (
                header::HeaderName::from_bytes(key.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                headers.insert(k, v);
            }
        }

        headers
    }

    fn map_send_error(&self, url: &str, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::RequestTimeout {
                url: url.to_string(),
                timeout: self
                    .config
                    .timeout
                    .request
                    .unwrap_or(self.config.timeout.connect),
            }
        } else {
            TransportError::ConnectionFailed(err.to_string())
        }
    }

    async fn dispatch(&self, request: ServiceRequest) -> TransportResult<Value> {
        request
            .validate()
            .map_err(|e| TransportError::ConfigurationError(e.to_string()))?;
        self.config.limits.check_request(request.body_len())?;

        let headers = self.build_headers(&request);
        let body_len = request.body_len();

        let builder = match request.method {
            HttpMethod::Get => self.http_client.get(&request.url),
            HttpMethod::Post => self.http_client.post(&request.url),
        };
        let builder = match request.body {
            Some(body) => builder.headers(headers).body(body),
            None => builder.headers(headers),
        };

        debug!(method = ?request.method, url = %request.url, bytes = body_len, "Dispatching request");
        self.metrics.record_sent(body_len);

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(&request.url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url: request.url,
            });
        }

        let response_bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(&request.url, &e))?;

        self.config.limits.check_response(response_bytes.len())?;

        let value: Value = serde_json::from_slice(&response_bytes).map_err(|e| {
            TransportError::SerializationFailed(format!("Response is not JSON: {e}"))
        })?;

        self.metrics.record_received(response_bytes.len());
        Ok(value)
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: ServiceRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Value>> + Send + '_>> {
        Box::pin(async move {
            let started = Instant::now();
            let url = request.url.clone();

            let result = self.dispatch(request).await;

            self.metrics.record_latency(started.elapsed());
            if let Err(e) = &result {
                self.metrics.record_failure();
                warn!(url = %url, error = %e, "Request failed");
            }
            result
        })
    }

    fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
