//! The persisted session object.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Credentials, token and expiry of the current user
///
/// Stored in the key-value store under the session key, in camelCase.
/// `is_authenticated` becomes true only after a token has been granted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    /// Account name
    pub username: Option<String>,
    /// Account password
    #[serde(
        serialize_with = "serialize_password",
        deserialize_with = "deserialize_password"
    )]
    pub password: Option<SecretString>,
    /// Current token
    pub auth_token: Option<String>,
    /// Token expiry, epoch milliseconds
    pub auth_token_expires: i64,
    /// True after a successful token acquisition
    pub is_authenticated: bool,
}

impl Session {
    /// True if a token exists and `now_ms` is before its expiry
    pub fn has_valid_token_at(&self, now_ms: i64) -> bool {
        self.auth_token.is_some() && self.auth_token_expires > now_ms
    }

    /// True if a token exists and its expiry has passed
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.auth_token.is_some() && self.auth_token_expires <= now_ms
    }

    /// True if both username and password are set and non-empty
    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    /// Username and password, unless either is missing or empty
    pub(crate) fn credentials(&self) -> Option<(String, SecretString)> {
        let username = self.username.as_deref().filter(|s| !s.is_empty())?;
        let password = self
            .password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())?;
        Some((username.to_string(), password.clone()))
    }

    /// Token if it is still valid at `now_ms`
    pub(crate) fn valid_token_at(&self, now_ms: i64) -> Option<String> {
        if self.has_valid_token_at(now_ms) {
            self.auth_token.clone()
        } else {
            None
        }
    }
}

// Custom serialization for the optional password
fn serialize_password<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

// Custom deserialization for the optional password
fn deserialize_password<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(s.map(SecretString::new))
}
