//! Authentication extractors.
//!
//! The signed-in user is resolved per request by asking the identity
//! provider about the access token stored in the session.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::set_sentry_user;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Where unauthenticated visitors of protected pages are sent.
pub const LOGIN_PATH: &str = "/login";

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireUser(pub CurrentUser);

/// Rejection for [`RequireUser`]: a redirect to the login page.
#[derive(Debug)]
pub struct RedirectToLogin;

impl IntoResponse for RedirectToLogin {
    fn into_response(self) -> Response {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = RedirectToLogin;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state.sessions().load_from_headers(&parts.headers);
        let user = state.auth().current_user(&session).await.ok_or_else(|| {
            tracing::debug!(path = %parts.uri.path(), "No signed-in user, redirecting to login");
            RedirectToLogin
        })?;

        set_sentry_user(&user);
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the signed-in user.
///
/// Unlike [`RequireUser`], this never rejects the request.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state.sessions().load_from_headers(&parts.headers);
        Ok(Self(state.auth().current_user(&session).await))
    }
}
