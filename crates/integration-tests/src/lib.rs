//! End-to-end test harness for the Shopdesk dashboard.
//!
//! Drives the real router with `tower::ServiceExt::oneshot`, backed by
//! in-memory repositories and a scripted identity provider. No database or
//! network is needed.
//!
//! ```bash
//! cargo test -p shopdesk-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use secrecy::SecretString;
use tower::ServiceExt;

use shopdesk_admin::{
    db::{DynCustomerRepository, DynProductRepository, MemoryRepository},
    middleware::{CookieSessionStore, Session},
    models::{CurrentUser, Customer, Product, session_keys},
    services::{
        AuthError, AuthGateway, IdentityProvider,
        auth::{AuthTokens, OtpType, RemoteSession, SignUpResponse},
    },
    state::AppState,
};

/// Session signing key used by every test app.
pub const TEST_SESSION_SECRET: &str = "k7#Qp2!vX9@mL4$wR8^tZ1&yB6*nC3%d";

/// Email of the account every [`TestApp`] starts with.
pub const EXISTING_EMAIL: &str = "owner@shop.test";
/// Password of [`EXISTING_EMAIL`].
pub const EXISTING_PASSWORD: &str = "Owner123!";

/// Email-confirmation token hash the fake provider accepts.
pub const VALID_TOKEN_HASH: &str = "valid-hash";

// =============================================================================
// Fake identity provider
// =============================================================================

/// In-memory identity provider.
///
/// Access tokens are `token-<email>`; anything else is rejected.
#[derive(Debug, Default)]
pub struct FakeIdentityProvider {
    accounts: Mutex<HashMap<String, String>>,
    revoked: Mutex<Vec<String>>,
    /// When set, signup returns a user without a session.
    require_confirmation: bool,
}

impl FakeIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        let provider = Self::default();
        provider.add_account(EXISTING_EMAIL, EXISTING_PASSWORD);
        provider
    }

    /// Signups return no session until the email is confirmed.
    #[must_use]
    pub fn requiring_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
    }

    #[must_use]
    pub fn has_account(&self, email: &str) -> bool {
        self.accounts.lock().unwrap().contains_key(email)
    }

    /// Delete the account; its tokens stop resolving.
    pub fn sign_out_everywhere(&self, email: &str) {
        self.accounts.lock().unwrap().remove(email);
    }

    /// Access tokens revoked through sign out.
    #[must_use]
    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }

    #[must_use]
    pub fn access_token_for(email: &str) -> String {
        format!("token-{email}")
    }

    fn user(email: &str) -> CurrentUser {
        CurrentUser {
            id: format!("user-{email}"),
            email: Some(email.to_string()),
        }
    }

    fn session_for(email: &str) -> RemoteSession {
        RemoteSession {
            tokens: AuthTokens {
                access_token: Self::access_token_for(email),
            },
            user: Self::user(email),
        }
    }
}

fn rejected(status: u16, message: &str) -> AuthError {
    AuthError::Rejected {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, AuthError> {
        match self.accounts.lock().unwrap().get(email) {
            Some(stored) if stored == password => Ok(Self::session_for(email)),
            _ => Err(rejected(400, "Invalid login credentials")),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, AuthError> {
        if self.has_account(email) {
            return Err(rejected(422, "User already registered"));
        }
        self.add_account(email, password);
        if self.require_confirmation {
            Ok(SignUpResponse::User(Self::user(email)))
        } else {
            Ok(SignUpResponse::Session(Self::session_for(email)))
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.revoked.lock().unwrap().push(access_token.to_string());
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<CurrentUser, AuthError> {
        if self.revoked.lock().unwrap().iter().any(|t| t == access_token) {
            return Err(rejected(401, "Session expired"));
        }
        access_token
            .strip_prefix("token-")
            .filter(|email| self.has_account(email))
            .map(Self::user)
            .ok_or_else(|| rejected(401, "Invalid JWT"))
    }

    async fn verify_otp(
        &self,
        token_hash: &str,
        _kind: OtpType,
    ) -> Result<RemoteSession, AuthError> {
        if token_hash == VALID_TOKEN_HASH {
            Ok(Self::session_for(EXISTING_EMAIL))
        } else {
            Err(rejected(403, "Email link is invalid or has expired"))
        }
    }
}

// =============================================================================
// Test app
// =============================================================================

/// A router plus handles on its backends.
pub struct TestApp {
    pub router: Router,
    pub products: Arc<MemoryRepository<Product>>,
    pub customers: Arc<MemoryRepository<Customer>>,
    pub provider: Arc<FakeIdentityProvider>,
    pub sessions: CookieSessionStore,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Empty stores, one existing account.
    #[must_use]
    pub fn new() -> Self {
        Self::build(
            MemoryRepository::new(),
            MemoryRepository::new(),
            FakeIdentityProvider::new(),
        )
    }

    /// Custom backends.
    #[must_use]
    pub fn build(
        products: MemoryRepository<Product>,
        customers: MemoryRepository<Customer>,
        provider: FakeIdentityProvider,
    ) -> Self {
        let products = Arc::new(products);
        let customers = Arc::new(customers);
        let provider = Arc::new(provider);
        let sessions =
            CookieSessionStore::new(&SecretString::from(TEST_SESSION_SECRET)).unwrap();

        let product_repo: Arc<DynProductRepository> = products.clone();
        let customer_repo: Arc<DynCustomerRepository> = customers.clone();
        let state = AppState::from_parts(
            sessions.clone(),
            AuthGateway::new(provider.clone()),
            product_repo,
            customer_repo,
        );

        Self {
            router: shopdesk_admin::app(state),
            products,
            customers,
            provider,
            sessions,
        }
    }

    /// `Cookie` header value for a session signed in as [`EXISTING_EMAIL`].
    #[must_use]
    pub fn signed_in_cookie(&self) -> String {
        let mut session = Session::new();
        session
            .insert(
                session_keys::AUTH,
                &AuthTokens {
                    access_token: FakeIdentityProvider::access_token_for(EXISTING_EMAIL),
                },
            )
            .unwrap();
        cookie_pair(&self.sessions.commit(&session).unwrap())
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::get(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body)).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// A fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// The session cookie to send with the next request.
    #[must_use]
    pub fn next_cookie(&self) -> String {
        cookie_pair(self.set_cookie().unwrap())
    }

    #[must_use]
    pub fn is_redirect_to(&self, path: &str) -> bool {
        self.status == StatusCode::SEE_OTHER && self.location() == Some(path)
    }
}

/// The `name=value` part of a `Set-Cookie` value.
#[must_use]
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}
