//! Cookie service: set/clear the httpOnly token cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gatekeep_core::auth::session::TokenTtl;
use gatekeep_core::models::auth::TokenPair;
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Attributes shared by both token cookies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSettings {
    /// `Domain` attribute; host-only when unset.
    pub domain: Option<String>,
    /// `Secure` attribute. Enable outside local development.
    pub secure: bool,
}

fn token_cookie(
    name: &'static str,
    value: String,
    settings: &CookieSettings,
    max_age: Duration,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    if let Some(domain) = &settings.domain {
        cookie.set_domain(domain.clone());
    }
    cookie.set_max_age(max_age);
    cookie
}

/// Build the access token cookie, living as long as the token.
pub fn access_cookie(token: &str, settings: &CookieSettings, ttl: chrono::Duration) -> Cookie<'static> {
    token_cookie(
        ACCESS_COOKIE,
        token.to_string(),
        settings,
        Duration::seconds(ttl.num_seconds()),
    )
}

/// Build the refresh token cookie, living as long as the token.
pub fn refresh_cookie(token: &str, settings: &CookieSettings, ttl: chrono::Duration) -> Cookie<'static> {
    token_cookie(
        REFRESH_COOKIE,
        token.to_string(),
        settings,
        Duration::seconds(ttl.num_seconds()),
    )
}

/// Build expired cookie to clear the access token.
pub fn clear_access_cookie(settings: &CookieSettings) -> Cookie<'static> {
    token_cookie(ACCESS_COOKIE, String::new(), settings, Duration::ZERO)
}

/// Build expired cookie to clear the refresh token.
pub fn clear_refresh_cookie(settings: &CookieSettings) -> Cookie<'static> {
    token_cookie(REFRESH_COOKIE, String::new(), settings, Duration::ZERO)
}

/// Add both token cookies to `jar`.
pub fn set_token_cookies(
    jar: CookieJar,
    pair: &TokenPair,
    settings: &CookieSettings,
    ttl: TokenTtl,
) -> CookieJar {
    jar.add(access_cookie(&pair.access_token, settings, ttl.access))
        .add(refresh_cookie(&pair.refresh_token, settings, ttl.refresh))
}

/// Expire both token cookies.
pub fn clear_token_cookies(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    jar.add(clear_access_cookie(settings))
        .add(clear_refresh_cookie(settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_cookie_attributes() {
        let settings = CookieSettings {
            domain: Some("example.com".into()),
            secure: true,
        };
        let cookie = access_cookie("tok", &settings, chrono::Duration::minutes(15));

        assert_eq!(cookie.name(), "accessToken");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.max_age(), Some(Duration::minutes(15)));
    }

    #[test]
    fn refresh_cookie_is_host_only_without_domain() {
        let cookie = refresh_cookie("r", &CookieSettings::default(), chrono::Duration::days(365));
        assert_eq!(cookie.name(), "refreshToken");
        assert_eq!(cookie.domain(), None);
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(Duration::days(365)));
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        let settings = CookieSettings::default();
        for cookie in [clear_access_cookie(&settings), clear_refresh_cookie(&settings)] {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        }
    }
}
