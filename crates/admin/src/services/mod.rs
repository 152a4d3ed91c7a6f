//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `auth` - Delegated authentication against a GoTrue identity provider

pub mod auth;

pub use auth::{AuthError, AuthGateway, IdentityProvider, SupabaseAuth};
