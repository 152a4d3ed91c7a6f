//! Unified error handling for the dashboard.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::middleware::session::SessionError;
use crate::models::CurrentUser;
use crate::services::AuthError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity provider rejected the request or could not be reached.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session could not be written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Generic error page.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: String,
    pub message: String,
    /// Error chain, only filled in debug builds.
    pub detail: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(AuthError::Rejected { status, .. }) if *status >= 500 => {
                StatusCode::BAD_GATEWAY
            }
            Self::Auth(AuthError::Rejected { .. }) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::Http(_) | AuthError::Parse(_)) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::Url(_) | AuthError::Session(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the user.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Session(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::Rejected { message, .. }) => message.clone(),
            Self::Auth(_) => "Authentication service unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// The error and its sources, outermost first.
    fn chain(&self) -> String {
        let mut chain = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push_str("\ncaused by: ");
            chain.push_str(&err.to_string());
            source = err.source();
        }
        chain
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let template = ErrorTemplate {
            status: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.public_message(),
            detail: cfg!(debug_assertions).then(|| self.chain()),
        };

        let body = template.render().unwrap_or_else(|e| {
            tracing::error!("Template render error: {}", e);
            template.message.clone()
        });

        (status, Html(body)).into_response()
    }
}

/// Set the Sentry user context from the signed-in user.
pub fn set_sentry_user(user: &CurrentUser) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.clone()),
            email: user.email.clone(),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product".to_string());
        assert_eq!(err.to_string(), "Not found: product");

        let err = AppError::BadRequest("unknown intent".to_string());
        assert_eq!(err.to_string(), "Bad request: unknown intent");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotAcknowledged)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_statuses() {
        let rejected = AppError::Auth(AuthError::Rejected {
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(rejected.public_message(), "Invalid login credentials");

        let provider_down = AppError::Auth(AuthError::Rejected {
            status: 503,
            message: "upstream".to_string(),
        });
        assert_eq!(provider_down.status(), StatusCode::BAD_GATEWAY);

        let garbled = AppError::Auth(AuthError::Parse("eof".to_string()));
        assert_eq!(garbled.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(garbled.public_message(), "Authentication service unavailable");
    }

    #[test]
    fn test_internal_details_are_not_public() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "price column held postgres://secret".to_string(),
        ));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_chain_includes_sources() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad price".to_string()));
        let chain = err.chain();
        assert!(chain.starts_with("Database error: data corruption: bad price"));
    }
}
