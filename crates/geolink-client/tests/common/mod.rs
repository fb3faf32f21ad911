//! Common test utilities for integration tests
//!
//! A mock feature service with a read-only root, an editable root and a token
//! endpoint, driven through the real HTTP transport.

#![allow(dead_code)]

use geolink_client::{KeyValueStore, MemoryStore, ServiceClient};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, Request, ResponseTemplate,
    matchers::{method, path},
};

pub const SERVICE_PATH: &str = "/arcgis/rest/services/Cities";
pub const EDITABLE_PATH: &str = "/arcgis/rest/services/CitiesEdit";
pub const TOKEN_PATH: &str = "/arcgis/tokens/generateToken";

/// Mock feature service
pub struct MockFeatureServer {
    pub server: MockServer,
    pub service_url: String,
    pub editable_url: String,
    pub token_url: String,
}

impl MockFeatureServer {
    /// Start a new mock feature service
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();

        Self {
            service_url: format!("{base_url}{SERVICE_PATH}"),
            editable_url: format!("{base_url}{EDITABLE_PATH}"),
            token_url: format!("{base_url}{TOKEN_PATH}"),
            server,
        }
    }

    /// Client against this server with an in-memory session store
    pub async fn client(&self) -> ServiceClient {
        self.client_with_store(Arc::new(MemoryStore::new())).await
    }

    /// Client against this server persisting its session in `store`
    pub async fn client_with_store(&self, store: Arc<dyn KeyValueStore>) -> ServiceClient {
        ServiceClient::builder()
            .with_service_url(&self.service_url)
            .with_editable_service_url(&self.editable_url)
            .with_token_url(&self.token_url)
            .with_store(store)
            .build()
            .await
            .expect("client builds")
    }

    /// Token endpoint grants `token`, valid for an hour; expected `times` calls
    pub async fn mock_token_success(&self, token: &str, times: u64) {
        let expires = chrono::Utc::now().timestamp_millis() + 3_600_000;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": token,
                "expires": expires,
                "ssl": false
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Token endpoint rejects the credentials
    pub async fn mock_token_invalid_credentials(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {
                    "code": 200,
                    "message": "Unable to generate token.",
                    "details": ["Invalid credentials"]
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Any POST under `root` + `route` answers `body`
    pub async fn mock_route(&self, root: &str, route: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path(format!("{root}/{route}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Like [`mock_route`](Self::mock_route) with an expected call count and a delay
    pub async fn mock_route_expecting(
        &self,
        root: &str,
        route: &str,
        body: Value,
        times: u64,
        delay: Duration,
    ) {
        Mock::given(method("POST"))
            .and(path(format!("{root}/{route}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body)
                    .set_delay(delay),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Requests received on `full_path`
    pub async fn requests_to(&self, full_path: &str) -> Vec<Request> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.url.path() == full_path)
            .collect()
    }
}

/// Decode a form-encoded request body
pub fn form(request: &Request) -> HashMap<String, String> {
    String::from_utf8_lossy(&request.body)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((
                urlencoding::decode(name).ok()?.into_owned(),
                urlencoding::decode(value).ok()?.into_owned(),
            ))
        })
        .collect()
}

/// Feature class descriptor for a point layer of hydrants
pub fn hydrant_metadata() -> Value {
    json!({
        "id": 3,
        "name": "Hydrants",
        "type": "Feature Layer",
        "geometryType": "esriGeometryPoint",
        "extent": {"xmin": -123.0, "ymin": 45.0, "xmax": -122.0, "ymax": 46.0, "spatialReference": {"wkid": 4326}},
        "fields": [
            {"name": "OBJECTID", "type": "esriFieldTypeOID", "alias": "OBJECTID"},
            {"name": "SHAPE", "type": "esriFieldTypeGeometry", "alias": "SHAPE"},
            {"name": "NAME", "type": "esriFieldTypeString", "alias": "Name", "length": 64},
            {"name": "INSPECTED", "type": "esriFieldTypeDate", "alias": "Inspected"}
        ]
    })
}

/// Service descriptor listing the hydrant layer
pub fn service_metadata() -> Value {
    json!({
        "currentVersion": 10.91,
        "serviceDescription": "City assets",
        "layers": [{"id": 3, "name": "Hydrants"}],
        "tables": [{"id": 9, "name": "Inspections"}]
    })
}
