//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home (toast + current user)
//!
//! # Auth (delegated to the identity provider)
//! GET  /signup    POST /signup        - Register, then create a customer record
//! GET  /login     POST /login         - Email + password sign in
//! POST /logout                        - Sign out
//! GET  /auth/confirm                  - Email confirmation link
//!
//! # Dashboard (signed-in users only)
//! GET  /dashboard                     - Overview
//! GET  /dashboard/products            - Product listing
//! GET  /dashboard/products/new  POST  - Create product
//! GET  /dashboard/products/{id} POST  - Edit product (intent=save|delete)
//! GET  /dashboard/customer            - Customer listing
//! GET  /dashboard/customer/new  POST  - Create customer
//! GET  /dashboard/customer/{id} POST  - Edit customer (intent=save|delete)
//! ```
//!
//! Handlers that touch the session commit it on every response, including
//! 400s, via [`with_session`].

pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod home;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::filters;
use crate::middleware::session::Session;
use crate::models::{CurrentUser, Toast};
use crate::state::AppState;

/// Layout data shared by every page.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Flash toast delivered with this request.
    pub toast: Option<Toast>,
    /// Email of the signed-in user, for the header.
    pub user_email: Option<String>,
    /// Path of the current page, for navigation highlighting.
    pub current_path: String,
}

impl PageContext {
    /// Build the layout data, consuming any pending toast.
    pub fn new(session: &mut Session, user: Option<&CurrentUser>, current_path: &str) -> Self {
        Self {
            toast: session.take_toast(),
            user_email: user.and_then(|u| u.email.clone()),
            current_path: current_path.to_string(),
        }
    }

    /// Whether `path` is the current page or one of its children.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        if path == "/dashboard" {
            self.current_path == path
        } else {
            self.current_path.starts_with(path)
        }
    }
}

/// Shown when an action could not be carried out.
#[derive(Template, WebTemplate)]
#[template(path = "action_failed.html")]
pub struct ActionFailedTemplate {
    pub page: PageContext,
    pub message: String,
    pub back_href: String,
}

/// Commit `session` and attach it to `response` as `Set-Cookie`.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be serialized.
pub fn with_session(
    state: &AppState,
    session: &Session,
    response: impl IntoResponse,
) -> Result<Response, AppError> {
    let cookie = state.sessions().commit(session)?;
    Ok(([(SET_COOKIE, cookie)], response).into_response())
}

/// Which button submitted an edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Save,
    Delete,
}

impl Intent {
    /// Parse the posted `intent` field. A missing intent means save.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for any other value.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            None | Some("save") => Ok(Self::Save),
            Some("delete") => Ok(Self::Delete),
            Some(other) => Err(AppError::BadRequest(format!("unknown intent: {other}"))),
        }
    }
}

/// Build the application router (without health checks or layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(home::router())
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(products::router())
        .merge(customers::router())
}
