//! API server configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use gatekeep_core::auth::jwt::resolve_key_pem;
use gatekeep_core::auth::oauth::{DEFAULT_HTTP_TIMEOUT, OAuthProviderConfig};
use gatekeep_core::auth::password::DEFAULT_BCRYPT_COST;
use gatekeep_core::auth::AuthError;
use gatekeep_core::auth::session::{ACCESS_TOKEN_EXPIRY_SECS, REFRESH_TOKEN_EXPIRY_SECS, TokenTtl};
use tracing::warn;

use crate::services::cookies::CookieSettings;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:1234").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Frontend origin: the only CORS origin and the OAuth redirect target.
    pub origin: String,
    pub cookies: CookieSettings,
    /// PEM-encoded RSA private key (PKCS#1 or PKCS#8).
    pub private_key_pem: String,
    /// PEM-encoded RSA public key.
    pub public_key_pem: String,
    pub google: OAuthProviderConfig,
    pub token_ttl: TokenTtl,
    /// bcrypt work factor.
    pub bcrypt_cost: u32,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("origin", &self.origin)
            .field("cookies", &self.cookies)
            .field("google", &self.google)
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                              |
    /// |--------------------------|--------------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:1234`                     |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/gatekeep` |
    /// | `ORIGIN`                 | `http://localhost:3000`              |
    /// | `COOKIE_DOMAIN`          | unset (host-only)                    |
    /// | `COOKIE_SECURE`          | `false`                              |
    /// | `PRIVATE_KEY` / `PRIVATE_KEY_FILE` | required                   |
    /// | `PUBLIC_KEY` / `PUBLIC_KEY_FILE`   | required                   |
    /// | `GOOGLE_CLIENT_ID`       | empty                                |
    /// | `GOOGLE_CLIENT_SECRET`   | empty                                |
    /// | `GOOGLE_REDIRECT_URL`    | `http://localhost:1234/api/sessions/oauth/google` |
    /// | `ACCESS_TOKEN_TTL_SECS`  | `900`                                |
    /// | `REFRESH_TOKEN_TTL_SECS` | `31536000`                           |
    /// | `SALT_WORK_FACTOR`       | `10`                                 |
    /// | `HTTP_TIMEOUT_SECS`      | `10`                                 |
    ///
    /// Missing keys come back empty; [`crate::AppState::new`] rejects them.
    /// Token TTLs must be positive and representable, otherwise this fails
    /// with [`AuthError::Config`].
    pub fn from_env() -> Result<Self, AuthError> {
        let google = OAuthProviderConfig {
            timeout: Duration::from_secs(env_parse(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT.as_secs(),
            )),
            ..OAuthProviderConfig::google(
                &env_or("GOOGLE_CLIENT_ID", ""),
                &env_or("GOOGLE_CLIENT_SECRET", ""),
                &env_or(
                    "GOOGLE_REDIRECT_URL",
                    "http://localhost:1234/api/sessions/oauth/google",
                ),
            )
        };

        let token_ttl = TokenTtl::from_secs(
            env_parse("ACCESS_TOKEN_TTL_SECS", ACCESS_TOKEN_EXPIRY_SECS),
            env_parse("REFRESH_TOKEN_TTL_SECS", REFRESH_TOKEN_EXPIRY_SECS),
        )?;

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:1234"),
            database_url: env_or("DATABASE_URL", "postgres://localhost:5432/gatekeep"),
            origin: env_or("ORIGIN", "http://localhost:3000"),
            cookies: CookieSettings {
                domain: std::env::var("COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
                secure: env_parse("COOKIE_SECURE", false),
            },
            private_key_pem: resolve_key_pem("PRIVATE_KEY").unwrap_or_default(),
            public_key_pem: resolve_key_pem("PUBLIC_KEY").unwrap_or_default(),
            google,
            token_ttl,
            bcrypt_cost: env_parse("SALT_WORK_FACTOR", DEFAULT_BCRYPT_COST),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        Err(_) => default,
    }
}
