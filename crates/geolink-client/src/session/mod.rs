//! Session lifecycle: credentials, token acquisition and expiry.
//!
//! The session is owned by [`SessionManager`] and persisted to a
//! [`KeyValueStore`] after every change. Token acquisition is single-flight:
//! concurrent callers that find no valid token wait for one request.

mod state;

pub use state::Session;

use geolink_transport_traits::{ServiceRequest, Transport};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::params::{QueryParams, compose_query};
use crate::store::KeyValueStore;

/// Error code the token endpoint uses for rejected credentials
const INVALID_CREDENTIALS_CODE: i64 = 200;
/// Detail text that accompanies [`INVALID_CREDENTIALS_CODE`]
const INVALID_CREDENTIALS_DETAIL: &str = "Invalid credentials";

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Answer of the token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenResponse {
    /// A token and its expiry in epoch milliseconds
    Granted { token: String, expires: i64 },
    /// The exact invalid-credentials error shape
    InvalidCredentials,
}

/// Interpret a token endpoint body
pub(crate) fn parse_token_response(response: &Value) -> ClientResult<TokenResponse> {
    if let Some(error) = response.get("error") {
        let code = error.get("code").and_then(Value::as_i64);
        let detail_matches = match error.get("details") {
            Some(Value::String(s)) => s == INVALID_CREDENTIALS_DETAIL,
            Some(Value::Array(items)) => items
                .iter()
                .any(|d| d.as_str() == Some(INVALID_CREDENTIALS_DETAIL)),
            _ => false,
        };
        if code == Some(INVALID_CREDENTIALS_CODE) && detail_matches {
            return Ok(TokenResponse::InvalidCredentials);
        }
        return Err(ClientError::from_service_error(error));
    }

    let token = response
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ClientError::MalformedResponse("token response has no token".to_string()))?;
    let expires = response
        .get("expires")
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            ClientError::MalformedResponse("token response has no expires".to_string())
        })?;

    Ok(TokenResponse::Granted {
        token: token.to_string(),
        expires,
    })
}

/// Owns the [`Session`] and decides when to request a token
#[derive(Debug)]
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    token_url: Option<String>,
    session_key: String,
    state: RwLock<Session>,
    refresh: Mutex<()>,
}

impl SessionManager {
    /// Create a manager starting from the session persisted under `session_key`
    ///
    /// A stored value that does not decode as a session is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store cannot be read.
    pub async fn load(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        token_url: Option<String>,
        session_key: impl Into<String>,
    ) -> ClientResult<Self> {
        let session_key = session_key.into();
        let session = match store.get(&session_key).await? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(key = %session_key, error = %e, "Stored session is unreadable, starting fresh");
                Session::default()
            }),
            None => Session::default(),
        };
        debug!(
            key = %session_key,
            authenticated = session.is_authenticated,
            "Session loaded"
        );

        Ok(Self {
            transport,
            store,
            token_url,
            session_key,
            state: RwLock::new(session),
            refresh: Mutex::new(()),
        })
    }

    /// A token for the next request, acquiring one if needed
    ///
    /// Returns the cached token while it is valid. Otherwise, with credentials
    /// set, requests a new one; without credentials resolves to `None`
    /// (anonymous access). Rejected credentials reset the session and also
    /// resolve to `None`.
    ///
    /// # Errors
    ///
    /// Transport failures and unexpected token responses are returned with
    /// the session unchanged.
    pub async fn token(&self) -> ClientResult<Option<String>> {
        if let Some(token) = self.state.read().await.valid_token_at(now_ms()) {
            return Ok(Some(token));
        }

        let _refresh = self.refresh.lock().await;

        // Another caller may have refreshed while we waited
        let (username, password) = {
            let session = self.state.read().await;
            if let Some(token) = session.valid_token_at(now_ms()) {
                return Ok(Some(token));
            }
            match session.credentials() {
                Some(credentials) => credentials,
                None => return Ok(None),
            }
        };

        match self.request_token(&username, &password).await? {
            TokenResponse::Granted { token, expires } => {
                self.update(|session| {
                    session.auth_token = Some(token.clone());
                    session.auth_token_expires = expires;
                    session.is_authenticated = true;
                })
                .await?;
                Ok(Some(token))
            }
            TokenResponse::InvalidCredentials => {
                self.reset().await?;
                Ok(None)
            }
        }
    }

    /// Set credentials and acquire a token with them
    ///
    /// Returns `false` when the service rejects the credentials; the session
    /// is then reset to defaults.
    ///
    /// # Errors
    ///
    /// Transport failures and unexpected token responses are returned with
    /// the session unchanged. An empty username or password is rejected with
    /// [`ClientError::InvalidInput`] before any request.
    pub async fn authenticate(
        &self,
        username: impl Into<String>,
        password: SecretString,
    ) -> ClientResult<bool> {
        let username = username.into();
        if username.is_empty() || password.expose_secret().is_empty() {
            return Err(ClientError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }
        let _refresh = self.refresh.lock().await;

        match self.request_token(&username, &password).await? {
            TokenResponse::Granted { token, expires } => {
                self.replace(Session {
                    username: Some(username.clone()),
                    password: Some(password),
                    auth_token: Some(token),
                    auth_token_expires: expires,
                    is_authenticated: true,
                })
                .await?;
                info!(username = %username, "Authenticated");
                Ok(true)
            }
            TokenResponse::InvalidCredentials => {
                info!(username = %username, "Credentials rejected");
                self.reset().await?;
                Ok(false)
            }
        }
    }

    /// Reset the session to defaults
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the reset session cannot be persisted.
    pub async fn logout(&self) -> ClientResult<()> {
        let _refresh = self.refresh.lock().await;
        self.reset().await?;
        info!("Logged out");
        Ok(())
    }

    /// True if a token exists and has expired
    pub async fn is_expired(&self) -> bool {
        self.state.read().await.is_expired_at(now_ms())
    }

    /// True if a token exists and has not expired
    pub async fn has_valid_token(&self) -> bool {
        self.state.read().await.has_valid_token_at(now_ms())
    }

    /// True after a successful token acquisition
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> Session {
        self.state.read().await.clone()
    }

    /// Replace the session wholesale
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the session cannot be persisted.
    pub async fn restore(&self, session: Session) -> ClientResult<()> {
        let _refresh = self.refresh.lock().await;
        self.replace(session).await
    }

    async fn request_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> ClientResult<TokenResponse> {
        let url = self.token_url.as_deref().ok_or_else(|| {
            ClientError::InvalidConfig("no token endpoint configured".to_string())
        })?;

        let mut params = QueryParams::new();
        params.insert("username".to_string(), Value::from(username));
        params.insert(
            "password".to_string(),
            Value::from(password.expose_secret().as_str()),
        );
        params.insert("f".to_string(), Value::from("json"));

        debug!(username = %username, "Requesting token");
        let response = self
            .transport
            .send(ServiceRequest::form_post(url, compose_query(&params)))
            .await?;

        parse_token_response(&response)
    }

    async fn update(&self, mutate: impl FnOnce(&mut Session)) -> ClientResult<()> {
        let snapshot = {
            let mut session = self.state.write().await;
            mutate(&mut session);
            session.clone()
        };
        self.persist(&snapshot).await
    }

    async fn replace(&self, session: Session) -> ClientResult<()> {
        self.update(|current| *current = session).await
    }

    async fn reset(&self) -> ClientResult<()> {
        self.replace(Session::default()).await
    }

    async fn persist(&self, session: &Session) -> ClientResult<()> {
        let value = serde_json::to_value(session).map_err(crate::error::StoreError::from)?;
        self.store.set(&self.session_key, value).await?;
        Ok(())
    }
}
