//! GoTrue (Supabase Auth) HTTP client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::instrument;
use url::Url;

use super::error::ProviderErrorBody;
use super::{AuthError, IdentityProvider, OtpType, RemoteSession, SignUpResponse};
use crate::config::AuthProviderConfig;
use crate::models::CurrentUser;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider backed by a GoTrue server at `{AUTH_URL}/auth/v1/`.
#[derive(Clone)]
pub struct SupabaseAuth {
    inner: Arc<SupabaseAuthInner>,
}

struct SupabaseAuthInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
}

impl SupabaseAuth {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: &AuthProviderConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseAuthInner {
                client,
                base_url: with_trailing_slash(config.url.clone()),
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// A request carrying the project key, authorized as `bearer`.
    fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    /// A request authorized with the project key alone.
    fn anon_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request(method, url, self.inner.anon_key.expose_secret())
    }
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("base_url", &self.inner.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, AuthError> {
        let url = self.endpoint("auth/v1/token?grant_type=password")?;
        let response = self
            .anon_request(Method::POST, url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, AuthError> {
        let url = self.endpoint("auth/v1/signup")?;
        let response = self
            .anon_request(Method::POST, url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .request(Method::POST, url, access_token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(rejection(status, response).await)
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<CurrentUser, AuthError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .request(Method::GET, url, access_token)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self, token_hash))]
    async fn verify_otp(
        &self,
        token_hash: &str,
        kind: OtpType,
    ) -> Result<RemoteSession, AuthError> {
        let url = self.endpoint("auth/v1/verify")?;
        let response = self
            .anon_request(Method::POST, url)
            .json(&json!({ "type": kind, "token_hash": token_hash }))
            .send()
            .await?;
        read_json(response).await
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    let status = response.status();
    if !status.is_success() {
        return Err(rejection(status, response).await);
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| AuthError::Parse(e.to_string()))
}

async fn rejection(status: reqwest::StatusCode, response: Response) -> AuthError {
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return AuthError::Http(e),
    };
    let message = serde_json::from_str::<ProviderErrorBody>(&body)
        .ok()
        .and_then(ProviderErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("authentication failed")
                .to_string()
        });
    AuthError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::middleware::session::Session;
    use crate::models::session_keys;
    use crate::services::auth::{AuthGateway, AuthTokens};

    const ANON_KEY: &str = "anon-key";

    fn join(base: &str, path: &str) -> String {
        with_trailing_slash(Url::parse(base).unwrap())
            .join(path)
            .unwrap()
            .to_string()
    }

    fn client(server: &MockServer) -> SupabaseAuth {
        SupabaseAuth::new(&AuthProviderConfig {
            url: Url::parse(&server.base_url()).unwrap(),
            anon_key: SecretString::from(ANON_KEY),
        })
        .unwrap()
    }

    fn session_body() -> serde_json::Value {
        json!({
            "access_token": "jwt-access",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "jwt-refresh",
            "user": { "id": "u1", "email": "owner@shop.test", "role": "authenticated" }
        })
    }

    #[test]
    fn test_endpoint_on_bare_host() {
        assert_eq!(
            join("https://project.supabase.co", "auth/v1/token?grant_type=password"),
            "https://project.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        assert_eq!(
            join("http://localhost:8000/gateway", "auth/v1/user"),
            "http://localhost:8000/gateway/auth/v1/user"
        );
        assert_eq!(
            join("http://localhost:8000/gateway/", "auth/v1/user"),
            "http://localhost:8000/gateway/auth/v1/user"
        );
    }

    #[tokio::test]
    async fn test_sign_in_posts_password_grant() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/v1/token")
                    .query_param("grant_type", "password")
                    .header("apikey", ANON_KEY)
                    .header("authorization", format!("Bearer {ANON_KEY}"))
                    .json_body(json!({ "email": "owner@shop.test", "password": "Owner123!" }));
                then.status(200).json_body(session_body());
            })
            .await;

        let remote = client(&server)
            .sign_in_with_password("owner@shop.test", "Owner123!")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(remote.tokens.access_token, "jwt-access");
        assert_eq!(remote.user.id, "u1");
        assert_eq!(remote.user.email.as_deref(), Some("owner@shop.test"));
    }

    #[tokio::test]
    async fn test_sign_in_rejection_uses_error_description() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/token");
                then.status(400).json_body(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                }));
            })
            .await;

        let err = client(&server)
            .sign_in_with_password("owner@shop.test", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthError::Rejected { status: 400, ref message } if message == "Invalid login credentials"
        ));
    }

    #[tokio::test]
    async fn test_sign_up_rejection_uses_msg() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/signup");
                then.status(422)
                    .json_body(json!({ "code": 422, "msg": "User already registered" }));
            })
            .await;

        let err = client(&server)
            .sign_up("owner@shop.test", "Owner123!")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthError::Rejected { status: 422, ref message } if message == "User already registered"
        ));
    }

    #[tokio::test]
    async fn test_sign_up_without_session_returns_user() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/signup");
                then.status(200).json_body(json!({
                    "id": "u2",
                    "email": "new@shop.test",
                    "confirmation_sent_at": "2024-01-01T00:00:00Z"
                }));
            })
            .await;

        let response = client(&server)
            .sign_up("new@shop.test", "Secret123!")
            .await
            .unwrap();

        assert!(matches!(response, SignUpResponse::User(user) if user.id == "u2"));
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/v1/user");
                then.status(200)
                    .header("content-type", "text/html")
                    .body("<html>maintenance</html>");
            })
            .await;

        let err = client(&server).get_user("jwt-access").await.unwrap_err();

        assert!(matches!(err, AuthError::Parse(_)));
    }

    #[tokio::test]
    async fn test_server_error_without_json_uses_status_reason() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/v1/user");
                then.status(503).body("upstream down");
            })
            .await;

        let err = client(&server).get_user("jwt-access").await.unwrap_err();

        assert!(matches!(
            err,
            AuthError::Rejected { status: 503, ref message } if message == "Service Unavailable"
        ));
    }

    #[tokio::test]
    async fn test_get_user_sends_user_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/auth/v1/user")
                    .header("apikey", ANON_KEY)
                    .header("authorization", "Bearer jwt-access");
                then.status(200)
                    .json_body(json!({ "id": "u1", "email": "owner@shop.test" }));
            })
            .await;

        let user = client(&server).get_user("jwt-access").await.unwrap();

        mock.assert_async().await;
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_verify_otp_sends_snake_case_type() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/v1/verify")
                    .json_body(json!({ "type": "email_change", "token_hash": "hash" }));
                then.status(200).json_body(session_body());
            })
            .await;

        let remote = client(&server)
            .verify_otp("hash", OtpType::EmailChange)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(remote.tokens.access_token, "jwt-access");
    }

    #[tokio::test]
    async fn test_sign_out_of_expired_session_is_tolerated() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/v1/logout")
                    .header("authorization", "Bearer jwt-access");
                then.status(401).json_body(json!({ "msg": "invalid JWT" }));
            })
            .await;
        let gateway = AuthGateway::new(Arc::new(client(&server)));
        let mut session = Session::new();
        session
            .insert(
                session_keys::AUTH,
                &AuthTokens {
                    access_token: "jwt-access".to_string(),
                },
            )
            .unwrap();

        gateway.sign_out(&mut session).await.unwrap();

        mock.assert_async().await;
        assert!(session.get::<AuthTokens>(session_keys::AUTH).is_none());
    }

    #[tokio::test]
    async fn test_sign_out_server_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/logout");
                then.status(500);
            })
            .await;

        let err = client(&server).sign_out("jwt-access").await.unwrap_err();

        assert!(matches!(err, AuthError::Rejected { status: 500, .. }));
    }
}
