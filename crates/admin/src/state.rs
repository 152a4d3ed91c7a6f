//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::AdminConfig,
    db::{DynCustomerRepository, DynProductRepository, PgCustomerRepository, PgProductRepository},
    error::AppError,
    middleware::session::CookieSessionStore,
    services::{AuthGateway, SupabaseAuth},
};

/// Application state shared across all handlers.
///
/// Cheap to clone: everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    sessions: CookieSessionStore,
    auth: AuthGateway,
    products: Arc<DynProductRepository>,
    customers: Arc<DynCustomerRepository>,
    /// Only present when backed by `PostgreSQL`; used by the readiness probe.
    pool: Option<PgPool>,
}

impl AppState {
    /// Build the production state from configuration and a connected pool.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the session key is rejected or the identity
    /// provider client cannot be built.
    pub fn new(config: &AdminConfig, pool: PgPool) -> Result<Self, AppError> {
        let sessions = CookieSessionStore::new(&config.session_secret)?
            .with_ttl_seconds(config.session_ttl_seconds)
            .with_secure(config.secure_cookies());
        let auth = AuthGateway::new(Arc::new(SupabaseAuth::new(&config.auth)?));
        let products: Arc<DynProductRepository> =
            Arc::new(PgProductRepository::new(pool.clone()));
        let customers: Arc<DynCustomerRepository> =
            Arc::new(PgCustomerRepository::new(pool.clone()));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                sessions,
                auth,
                products,
                customers,
                pool: Some(pool),
            }),
        })
    }

    /// Build state from already-constructed parts, without a database pool.
    #[must_use]
    pub fn from_parts(
        sessions: CookieSessionStore,
        auth: AuthGateway,
        products: Arc<DynProductRepository>,
        customers: Arc<DynCustomerRepository>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                sessions,
                auth,
                products,
                customers,
                pool: None,
            }),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &CookieSessionStore {
        &self.inner.sessions
    }

    #[must_use]
    pub fn auth(&self) -> &AuthGateway {
        &self.inner.auth
    }

    #[must_use]
    pub fn products(&self) -> &DynProductRepository {
        self.inner.products.as_ref()
    }

    #[must_use]
    pub fn customers(&self) -> &DynCustomerRepository {
        self.inner.customers.as_ref()
    }

    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Whether backing services answer. Always true without a pool.
    pub async fn is_ready(&self) -> bool {
        match self.pool() {
            Some(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            None => true,
        }
    }
}

impl FromRef<AppState> for CookieSessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.inner.sessions.clone()
    }
}
