//! Request types handed to a transport.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Content type used for every body the feature service accepts.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Maximum number of custom headers per request
const MAX_CUSTOM_HEADERS: usize = 64;

/// HTTP verb of a [`ServiceRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET with parameters carried in the URL
    Get,
    /// POST with a form-encoded body
    Post,
}

/// A fully composed request: absolute URL plus an already-encoded body.
///
/// Parameter composition and token handling happen above the transport, so a
/// transport never inspects or rewrites the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    /// HTTP verb
    pub method: HttpMethod,

    /// Absolute request URL.
    pub url: String,

    /// Encoded request body, if any.
    pub body: Option<String>,

    /// Content type of `body`.
    pub content_type: Option<String>,

    /// Extra headers.
    pub headers: HashMap<String, String>,
}

impl ServiceRequest {
    /// Creates a form-encoded POST request.
    pub fn form_post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body.into()),
            content_type: Some(FORM_CONTENT_TYPE.to_string()),
            headers: HashMap::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            content_type: None,
            headers: HashMap::new(),
        }
    }

    /// Adds a header using a builder pattern.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Returns the size of the body in bytes.
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, String::len)
    }

    /// Validate header constraints
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.headers.len() > MAX_CUSTOM_HEADERS {
            return Err("Too many custom headers");
        }
        if self.method == HttpMethod::Get && self.body.is_some() {
            return Err("GET requests cannot carry a body");
        }
        Ok(())
    }
}
