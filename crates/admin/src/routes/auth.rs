//! Authentication route handlers.
//!
//! Signup, login and logout delegate to the identity provider. Provider
//! failures propagate to the error page; only form validation is rendered
//! inline.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use shopdesk_core::Email;

use super::{PageContext, with_session};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OptionalUser, Session};
use crate::models::NewCustomer;
use crate::services::auth::OtpType;
use crate::state::AppState;
use crate::validation::{FieldErrors, LoginForm, SignupForm};

/// Toast shown after a successful login.
pub const LOGGED_IN: &str = "logged in successfully";
/// Toast shown after logout.
pub const LOGGED_OUT: &str = "logged out succesfully";
/// Toast shown when the provider wants the email confirmed first.
pub const CONFIRM_EMAIL: &str = "Check your email to confirm your account";

// =============================================================================
// Templates
// =============================================================================

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
    pub email: String,
    pub errors: FieldErrors,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub errors: FieldErrors,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of an email confirmation link.
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<OtpType>,
    pub next: Option<String>,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", get(signup_page).post(signup))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/auth/confirm", get(confirm))
}

// =============================================================================
// Signup
// =============================================================================

/// GET /signup
#[instrument(skip_all)]
pub async fn signup_page(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    mut session: Session,
) -> Result<Response, AppError> {
    let page = PageContext::new(&mut session, user.as_ref(), "/signup");
    let template = SignupTemplate {
        page,
        email: String::new(),
        errors: FieldErrors::new(),
    };
    with_session(&state, &session, template)
}

/// Register with the identity provider, then record the email as a customer.
///
/// POST /signup
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "Signup form rejected");
        let page = PageContext::new(&mut session, None, "/signup");
        let template = SignupTemplate {
            page,
            email: form.email,
            errors,
        };
        return with_session(&state, &session, (StatusCode::BAD_REQUEST, template));
    }

    let email = Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let signup = state
        .auth()
        .sign_up(&mut session, email.as_str(), &form.password)
        .await?;

    let customer_id = state
        .customers()
        .create(&NewCustomer::from_email(email))
        .await?
        .into_id()?;
    tracing::info!(%customer_id, user_id = %signup.user.id, "Customer created for new signup");

    if !signup.signed_in {
        session.set_success_message(CONFIRM_EMAIL)?;
    }

    with_session(&state, &session, Redirect::to("/"))
}

// =============================================================================
// Login / Logout
// =============================================================================

/// GET /login
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    mut session: Session,
) -> Result<Response, AppError> {
    let page = PageContext::new(&mut session, user.as_ref(), "/login");
    let template = LoginTemplate {
        page,
        email: String::new(),
        errors: FieldErrors::new(),
    };
    with_session(&state, &session, template)
}

/// POST /login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        let page = PageContext::new(&mut session, None, "/login");
        let template = LoginTemplate {
            page,
            email: form.email,
            errors,
        };
        return with_session(&state, &session, (StatusCode::BAD_REQUEST, template));
    }

    let user = state
        .auth()
        .sign_in(&mut session, &form.email, &form.password)
        .await?;

    if user.email.is_some() {
        session.set_success_message(LOGGED_IN)?;
    }

    with_session(&state, &session, Redirect::to("/dashboard"))
}

/// POST /logout
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    state.auth().sign_out(&mut session).await?;
    session.set_success_message(LOGGED_OUT)?;
    with_session(&state, &session, Redirect::to("/login"))
}

// =============================================================================
// Email confirmation
// =============================================================================

/// Only same-site paths are followed after confirmation.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => "/",
    }
}

/// Browsers treat `\` like `/` and drop tabs and newlines, so `/\host`
/// and `/\t/host` both resolve off-site.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

/// GET /auth/confirm?token_hash=...&type=...&next=...
#[instrument(skip_all)]
pub async fn confirm(
    State(state): State<AppState>,
    mut session: Session,
    Query(query): Query<ConfirmQuery>,
) -> Result<Response, AppError> {
    let (Some(token_hash), Some(kind)) = (query.token_hash.as_deref(), query.kind) else {
        return Err(AppError::BadRequest(
            "confirmation link is missing token_hash or type".to_string(),
        ));
    };

    state.auth().verify_otp(&mut session, token_hash, kind).await?;

    let next = safe_next(query.next.as_deref()).to_string();
    with_session(&state, &session, Redirect::to(&next))
}
