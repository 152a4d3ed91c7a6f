//! Signed cookie session store.
//!
//! The whole session lives in the `__session` cookie: a base64url JSON
//! payload signed through `cookie`'s signed jar (HMAC-SHA256 under a key
//! derived from the session secret). The payload is signed, not encrypted,
//! so nothing secret beyond provider tokens goes in it.
//!
//! Handlers extract a [`Session`], mutate it, and attach the value returned
//! by [`CookieSessionStore::commit`] as `Set-Cookie` on every response.

use std::collections::BTreeMap;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::COOKIE, request::Parts},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use cookie::{Cookie, CookieJar, Key, SameSite};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Toast, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "__session";

/// Session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Shortest secret `Key::derive_from` accepts.
const MIN_SECRET_BYTES: usize = 32;

/// Errors raised while writing the session.
///
/// Reading never fails: a bad cookie is an empty session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A value could not be serialized into the session.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The signing secret is too short to derive a key from.
    #[error("session secret must be at least {MIN_SECRET_BYTES} bytes (got {0})")]
    InvalidKey(usize),
}

/// What actually goes into the cookie.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionPayload {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    flash: BTreeMap<String, Value>,
    /// Unix timestamp after which the payload is ignored.
    exp: i64,
}

/// A per-request session bag.
///
/// Flash values written with [`Session::flash`] are emitted by the next
/// commit. Flash values that arrived with the request are readable once via
/// [`Session::take_flash`] and are never re-emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    data: BTreeMap<String, Value>,
    incoming_flash: BTreeMap<String, Value>,
    outgoing_flash: BTreeMap<String, Value>,
}

impl Session {
    /// A new empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value. Missing keys and values of the wrong shape give `None`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Store a value under `key`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if `value` cannot be serialized.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SessionError> {
        self.data
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Remove a value, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Returns `true` if `key` holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Store a value delivered to the next request only.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if `value` cannot be serialized.
    pub fn flash<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SessionError> {
        self.outgoing_flash
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Return and clear a flash value delivered by the previous response.
    pub fn take_flash<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.incoming_flash
            .remove(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Return and clear the pending toast, if any.
    pub fn take_toast(&mut self) -> Option<Toast> {
        self.take_flash(session_keys::TOAST_MESSAGE)
    }

    /// Flash a success toast for the next page.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if the toast cannot be serialized.
    pub fn set_success_message(&mut self, message: &str) -> Result<(), SessionError> {
        self.flash(session_keys::TOAST_MESSAGE, &Toast::success(message))
    }

    /// Returns `true` if nothing would be written to the cookie.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.outgoing_flash.is_empty()
    }
}

/// Loads, signs and clears `__session` cookies.
#[derive(Clone)]
pub struct CookieSessionStore {
    key: Key,
    ttl_seconds: i64,
    secure: bool,
}

impl std::fmt::Debug for CookieSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSessionStore")
            .field("key", &"[REDACTED]")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("secure", &self.secure)
            .finish()
    }
}

impl CookieSessionStore {
    /// Create a store signing with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidKey` if `secret` is shorter than 32 bytes.
    pub fn new(secret: &SecretString) -> Result<Self, SessionError> {
        let master = secret.expose_secret().as_bytes();
        if master.len() < MIN_SECRET_BYTES {
            return Err(SessionError::InvalidKey(master.len()));
        }
        Ok(Self {
            key: Key::derive_from(master),
            ttl_seconds: SESSION_TTL_SECONDS,
            secure: true,
        })
    }

    /// Override the session lifetime.
    #[must_use]
    pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Set or drop the `Secure` cookie attribute. On by default.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Load the session from a raw `Cookie` header value.
    ///
    /// Absent, malformed, forged or expired cookies yield an empty session.
    #[must_use]
    pub fn load(&self, cookie_header: Option<&str>) -> Session {
        cookie_header
            .and_then(|header| {
                Cookie::split_parse(header)
                    .filter_map(Result::ok)
                    .find(|c| c.name() == SESSION_COOKIE_NAME)
                    .and_then(|c| self.decode(c.value()))
            })
            .unwrap_or_default()
    }

    /// Load the session from request headers, honouring multiple `Cookie` headers.
    #[must_use]
    pub fn load_from_headers(&self, headers: &HeaderMap) -> Session {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(|header| self.load(Some(header)))
            .find(|session| *session != Session::default())
            .unwrap_or_default()
    }

    /// Sign the session and return a full `Set-Cookie` header value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if the payload cannot be encoded.
    pub fn commit(&self, session: &Session) -> Result<String, SessionError> {
        let payload = SessionPayload {
            data: session.data.clone(),
            flash: session.outgoing_flash.clone(),
            exp: Utc::now().timestamp() + self.ttl_seconds,
        };
        let value = self.encode(&payload)?;
        Ok(self.build_cookie(value, self.ttl_seconds).to_string())
    }

    /// A `Set-Cookie` header value that clears the session cookie.
    #[must_use]
    pub fn destroy(&self) -> String {
        self.build_cookie(String::new(), 0).to_string()
    }

    fn build_cookie(&self, value: String, max_age_seconds: i64) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(max_age_seconds))
            .build()
    }

    fn encode(&self, payload: &SessionPayload) -> Result<String, SessionError> {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key)
            .add(Cookie::new(SESSION_COOKIE_NAME, body));
        Ok(jar
            .get(SESSION_COOKIE_NAME)
            .map(|signed| signed.value().to_string())
            .unwrap_or_default())
    }

    fn decode(&self, value: &str) -> Option<Session> {
        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(SESSION_COOKIE_NAME, value.to_string()));
        let Some(verified) = jar.signed(&self.key).get(SESSION_COOKIE_NAME) else {
            tracing::debug!("Rejected session cookie with bad signature");
            return None;
        };

        let json = URL_SAFE_NO_PAD.decode(verified.value()).ok()?;
        let payload: SessionPayload = serde_json::from_slice(&json).ok()?;
        if payload.exp <= Utc::now().timestamp() {
            tracing::debug!("Ignoring expired session cookie");
            return None;
        }

        Some(Session {
            data: payload.data,
            incoming_flash: payload.flash,
            outgoing_flash: BTreeMap::new(),
        })
    }
}

impl<S> FromRequestParts<S> for Session
where
    CookieSessionStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = CookieSessionStore::from_ref(state);
        Ok(store.load_from_headers(&parts.headers))
    }
}
