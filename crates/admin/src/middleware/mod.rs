//! Request extractors for sessions and authentication.
//!
//! - [`session`]: signed cookie session with flash messages
//! - [`auth`]: `RequireUser` / `OptionalUser` backed by the identity provider

pub mod auth;
pub mod session;

pub use auth::{OptionalUser, RequireUser};
pub use session::{CookieSessionStore, Session, SessionError};
