//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SESSION_SECRET` - Session cookie signing secret (min 32 chars, high entropy)
//! - `AUTH_URL` - Base URL of the identity provider (e.g. `https://xyz.supabase.co`)
//! - `AUTH_ANON_KEY` - Public API key sent to the identity provider
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3000)
//! - `ADMIN_BASE_URL` - Public URL for the dashboard (default: `http://localhost:3000`).
//!   Session cookies carry `Secure` unless this is plain `http`.
//! - `SESSION_TTL_SECONDS` - Session cookie lifetime (default: 86400)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sampling (default: 1.0)
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::middleware::session::SESSION_TTL_SECONDS;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a secret as copied from a sample `.env` (matched lowercase).
const PLACEHOLDER_MARKERS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL for the dashboard
    pub base_url: Url,
    /// Key for signing `__session` cookies
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub auth: AuthProviderConfig,
    pub sentry_dsn: Option<String>,
    /// e.g. "development", "staging", "production"
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
    pub tls: Option<TlsConfig>,
}

/// Identity provider (GoTrue / Supabase Auth) connection settings.
#[derive(Clone)]
pub struct AuthProviderConfig {
    /// Project base URL; the auth API lives under `/auth/v1/`.
    pub url: Url,
    /// Public ("anon") API key sent as the `apikey` header.
    pub anon_key: SecretString,
}

impl std::fmt::Debug for AuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProviderConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// PEM material for serving HTTPS directly.
#[derive(Clone)]
pub struct TlsConfig {
    pub cert_pem: String,
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from the process environment.
    ///
    /// Reads a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value does
    /// not parse, or the session secret looks like a placeholder or has low
    /// entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    ///
    /// # Errors
    ///
    /// Same as [`AdminConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let database_url = env
            .get("ADMIN_DATABASE_URL")
            .or_else(|| env.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("ADMIN_DATABASE_URL".to_string()))?;

        let session_secret = env.required("SESSION_SECRET")?;
        check_secret("SESSION_SECRET", &session_secret, MIN_SESSION_SECRET_LENGTH)?;

        let auth_url: Url = env.parsed_required("AUTH_URL")?;
        if auth_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "AUTH_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }
        let anon_key = env.required("AUTH_ANON_KEY")?;
        if let Err(e) = check_secret("AUTH_ANON_KEY", &anon_key, 0) {
            tracing::warn!("AUTH_ANON_KEY looks weak: {e}");
        }

        let tls = match (env.get("ADMIN_TLS_CERT"), env.get("ADMIN_TLS_KEY")) {
            (Some(cert_pem), Some(key_pem)) => Some(TlsConfig {
                cert_pem,
                key_pem: SecretString::from(key_pem),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "ADMIN_TLS_*".to_string(),
                    "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
                ));
            }
        };

        let session_ttl_seconds = env.parsed_or("SESSION_TTL_SECONDS", SESSION_TTL_SECONDS)?;
        if session_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SESSION_TTL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host: env.parsed_or("ADMIN_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: env.parsed_or("ADMIN_PORT", 3000)?,
            base_url: env.parsed_or(
                "ADMIN_BASE_URL",
                Url::from_str("http://localhost:3000").map_err(|e| {
                    ConfigError::InvalidEnvVar("ADMIN_BASE_URL".to_string(), e.to_string())
                })?,
            )?,
            session_secret: SecretString::from(session_secret),
            session_ttl_seconds,
            auth: AuthProviderConfig {
                url: auth_url,
                anon_key: SecretString::from(anon_key),
            },
            sentry_dsn: env.get("SENTRY_DSN"),
            sentry_environment: env.get("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parsed_or("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: env.parsed_or("SENTRY_TRACES_SAMPLE_RATE", 1.0)?,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() != "http" || self.tls.is_some()
    }
}

/// Variable lookup with typed accessors.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Set and non-blank.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    fn parsed_required<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Self::parse(key, &self.required(key)?)
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map_or(Ok(default), |raw| Self::parse(key, &raw))
    }
}

/// Shannon entropy of `s`, in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let counts = s.chars().fold(HashMap::<char, u32>::new(), |mut acc, c| {
        *acc.entry(c).or_default() += 1;
        acc
    });
    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }

    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / f64::from(total);
            -p * p.log2()
        })
        .sum()
}

/// Reject secrets that are too short, look like a placeholder, or have low entropy.
fn check_secret(name: &str, value: &str, min_len: usize) -> Result<(), ConfigError> {
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(name.to_string(), reason));

    let len = value.chars().count();
    if len < min_len {
        return insecure(format!("must be at least {min_len} characters (got {len})"));
    }

    let lower = value.to_lowercase();
    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lower.contains(**m)) {
        return insecure(format!("appears to be a placeholder (contains '{marker}')"));
    }

    let entropy = shannon_entropy(value);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const GOOD_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(vars: &[(&str, &str)]) -> Result<AdminConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AdminConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/shopdesk"),
            ("SESSION_SECRET", GOOD_SECRET),
            ("AUTH_URL", "https://project.supabase.co"),
            ("AUTH_ANON_KEY", "eyJhbGciOiJIUzI1NiJ9.k9Zq2LmR"),
        ]
    }

    #[test]
    fn test_shannon_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_check_secret_rejects_placeholder() {
        let result = check_secret("TEST_VAR", "your-session-key-here-0123456789", 32);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_check_secret_rejects_low_entropy() {
        assert!(check_secret("TEST_VAR", "r3m1xr0ck5r3m1xr0ck5r3m1xr0ck5r3", 32).is_err());
    }

    #[test]
    fn test_check_secret_rejects_short() {
        let err = check_secret("TEST_VAR", "aB3$xY9!", 32).unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_check_secret_accepts_random() {
        assert!(check_secret("TEST_VAR", GOOD_SECRET, 32).is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&minimal()).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.session_ttl_seconds, SESSION_TTL_SECONDS);
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
        assert!(config.tls.is_none());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_admin_database_url_wins() {
        let mut vars = minimal();
        vars.push(("ADMIN_DATABASE_URL", "postgres://db/admin"));
        let config = load(&vars).unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://db/admin");
    }

    #[test]
    fn test_missing_session_secret() {
        let vars: Vec<_> = minimal()
            .into_iter()
            .filter(|(k, _)| *k != "SESSION_SECRET")
            .collect();
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingEnvVar(key)) if key == "SESSION_SECRET"
        ));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = minimal();
        vars.push(("ADMIN_PORT", "eighty"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "ADMIN_PORT"
        ));
    }

    #[test]
    fn test_tls_needs_both_halves() {
        let mut vars = minimal();
        vars.push(("ADMIN_TLS_CERT", "-----BEGIN CERTIFICATE-----"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_https_base_url_enables_secure_cookies() {
        let mut vars = minimal();
        vars.push(("ADMIN_BASE_URL", "https://admin.shop.test"));
        assert!(load(&vars).unwrap().secure_cookies());
    }

    #[test]
    fn test_auth_provider_config_debug_redacts_key() {
        let config = AuthProviderConfig {
            url: Url::parse("https://project.supabase.co").unwrap(),
            anon_key: SecretString::from("eyJhbGciOiJIUzI1NiJ9.super-secret-anon"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("project.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-anon"));
    }
}
