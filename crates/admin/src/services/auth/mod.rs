//! Delegated authentication.
//!
//! Credentials are never stored here. The identity provider (a GoTrue /
//! Supabase Auth server) checks them and hands back a remote session whose
//! tokens are kept in the cookie session under [`session_keys::AUTH`].
//! "Who is signed in" is answered by asking the provider about the stored
//! access token on each request.

mod error;
mod supabase;

pub use error::AuthError;
pub use supabase::SupabaseAuth;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::middleware::session::Session;
use crate::models::{CurrentUser, session_keys};

/// Remote session tokens kept in the cookie session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// A session issued by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSession {
    #[serde(flatten)]
    pub tokens: AuthTokens,
    pub user: CurrentUser,
}

/// Result of a signup call.
///
/// Providers that require email confirmation return the new user without a
/// session.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(RemoteSession),
    User(CurrentUser),
}

/// What a successful signup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub user: CurrentUser,
    /// `false` when the user must confirm their email before signing in.
    pub signed_in: bool,
}

/// Kind of one-time token carried by an email link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Signup,
    Invite,
    Magiclink,
    Recovery,
    EmailChange,
    Email,
}

/// The identity provider's HTTP surface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, AuthError>;

    /// Register a new user.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, AuthError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Resolve the user behind `access_token`.
    async fn get_user(&self, access_token: &str) -> Result<CurrentUser, AuthError>;

    /// Redeem a hashed one-time token from an email link.
    async fn verify_otp(&self, token_hash: &str, kind: OtpType)
    -> Result<RemoteSession, AuthError>;
}

/// Session-aware front for an [`IdentityProvider`].
#[derive(Clone)]
pub struct AuthGateway {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthGateway {
    /// Create a gateway over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Sign in and store the remote session.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError` unchanged.
    #[instrument(skip(self, session, password))]
    pub async fn sign_in(
        &self,
        session: &mut Session,
        email: &str,
        password: &str,
    ) -> Result<CurrentUser, AuthError> {
        let remote = self.provider.sign_in_with_password(email, password).await?;
        session.insert(session_keys::AUTH, &remote.tokens)?;
        tracing::info!(user_id = %remote.user.id, "User signed in");
        Ok(remote.user)
    }

    /// Register a user, storing the remote session if the provider issued one.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError` unchanged.
    #[instrument(skip(self, session, password))]
    pub async fn sign_up(
        &self,
        session: &mut Session,
        email: &str,
        password: &str,
    ) -> Result<SignUp, AuthError> {
        let signup = match self.provider.sign_up(email, password).await? {
            SignUpResponse::Session(remote) => {
                session.insert(session_keys::AUTH, &remote.tokens)?;
                SignUp {
                    user: remote.user,
                    signed_in: true,
                }
            }
            SignUpResponse::User(user) => SignUp {
                user,
                signed_in: false,
            },
        };
        tracing::info!(
            user_id = %signup.user.id,
            signed_in = signup.signed_in,
            "User signed up"
        );
        Ok(signup)
    }

    /// Drop the stored tokens and revoke them remotely.
    ///
    /// A token the provider no longer recognises counts as signed out.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError` for any other failure.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, session: &mut Session) -> Result<(), AuthError> {
        let tokens: Option<AuthTokens> = session.get(session_keys::AUTH);
        session.remove(session_keys::AUTH);

        let Some(tokens) = tokens else {
            return Ok(());
        };

        match self.provider.sign_out(&tokens.access_token).await {
            Err(AuthError::Rejected { status, .. }) if matches!(status, 401 | 403 | 404) => {
                tracing::debug!(status, "Remote session already gone");
                Ok(())
            }
            other => other,
        }
    }

    /// The user behind the stored access token, if it still resolves.
    ///
    /// Every failure is `None`; nothing in the session is changed.
    #[instrument(skip_all)]
    pub async fn current_user(&self, session: &Session) -> Option<CurrentUser> {
        let tokens: AuthTokens = session.get(session_keys::AUTH)?;
        match self.provider.get_user(&tokens.access_token).await {
            Ok(user) => Some(user),
            Err(e) if e.is_rejection() => {
                tracing::debug!(error = %e, "Stored access token rejected");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve current user");
                None
            }
        }
    }

    /// Redeem an email confirmation link and store the resulting session.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError` unchanged.
    #[instrument(skip(self, session, token_hash))]
    pub async fn verify_otp(
        &self,
        session: &mut Session,
        token_hash: &str,
        kind: OtpType,
    ) -> Result<CurrentUser, AuthError> {
        let remote = self.provider.verify_otp(token_hash, kind).await?;
        session.insert(session_keys::AUTH, &remote.tokens)?;
        tracing::info!(user_id = %remote.user.id, "Email link verified");
        Ok(remote.user)
    }
}
