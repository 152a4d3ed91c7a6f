//! Authentication error types.

use serde::Deserialize;
use thiserror::Error;

use crate::middleware::session::SessionError;

/// Errors that can occur while talking to the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider refused the request (bad credentials, duplicate signup,
    /// expired link). The message is the provider's own.
    #[error("{message}")]
    Rejected {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider error message.
        message: String,
    },

    /// The provider could not be reached.
    #[error("identity provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with something we could not parse.
    #[error("unexpected identity provider response: {0}")]
    Parse(String),

    /// The identity provider URL could not be built.
    #[error("invalid identity provider URL: {0}")]
    Url(#[from] url::ParseError),

    /// Remote session tokens could not be stored.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Returns `true` if the provider answered and said no.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Error body returned by GoTrue. Different endpoints fill different fields.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ProviderErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ProviderErrorBody {
    /// The most specific message the provider sent.
    pub(super) fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}
