//! Integration tests: password login, session listing, logout and silent
//! refresh through the full router.

mod common;

use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::body::Body;
use std::sync::Arc;

use common::{
    ScriptedProvider, TestApp, body_json, cookie_request, google_profile, json_request,
    set_cookie, test_config,
};
use gatekeep_api::AppState;
use gatekeep_core::auth::AuthError;
use gatekeep_core::store::memory::MemoryStore;
use serde_json::json;

#[tokio::test]
async fn healthcheck_is_ok() {
    let app = TestApp::new();
    let resp = app.send(cookie_request(Method::GET, "/healthcheck", &[])).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_returns_identity_without_password() {
    let app = TestApp::new();
    let resp = app
        .send(json_request(
            Method::POST,
            "/api/users",
            json!({
                "email": "a@x.com",
                "name": "Alice",
                "password": "secret",
                "passwordConfirmation": "secret"
            }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["name"], "Alice");
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::new();
    assert_eq!(app.login("a@x.com").await.status(), StatusCode::OK);

    let resp = app
        .send(json_request(
            Method::POST,
            "/api/users",
            json!({
                "email": "a@x.com",
                "name": "Again",
                "password": "secret",
                "passwordConfirmation": "secret"
            }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn mismatched_confirmation_is_bad_request() {
    let app = TestApp::new();
    let resp = app
        .send(json_request(
            Method::POST,
            "/api/users",
            json!({
                "email": "a@x.com",
                "name": "Alice",
                "password": "secret",
                "passwordConfirmation": "other"
            }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "validation_error");
}

#[tokio::test]
async fn login_sets_cookies_and_returns_pair() {
    let app = TestApp::new();
    let resp = app.login("a@x.com").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let access = set_cookie(&resp, "accessToken").expect("access cookie");
    let refresh = set_cookie(&resp, "refreshToken").expect("refresh cookie");
    assert_eq!(access.http_only(), Some(true));
    assert_eq!(refresh.http_only(), Some(true));

    let body = body_json(resp).await;
    assert_eq!(body["accessToken"], access.value());
    assert_eq!(body["refreshToken"], refresh.value());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new();
    app.login("a@x.com").await;

    let wrong = app
        .send(json_request(
            Method::POST,
            "/api/sessions",
            json!({ "email": "a@x.com", "password": "nope" }),
        ))
        .await;
    let unknown = app
        .send(json_request(
            Method::POST,
            "/api/sessions",
            json!({ "email": "b@x.com", "password": "secret" }),
        ))
        .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong).await, body_json(unknown).await);
}

#[tokio::test]
async fn anonymous_requests_are_rejected_by_protected_routes() {
    let app = TestApp::new();
    for uri in ["/api/me", "/api/sessions"] {
        let resp = app.send(cookie_request(Method::GET, uri, &[])).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
    let resp = app.send(cookie_request(Method::DELETE, "/api/sessions", &[])).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_then_logout() {
    let app = TestApp::new();
    let login = app.login("a@x.com").await;
    let access = set_cookie(&login, "accessToken").expect("access cookie");
    let refresh = set_cookie(&login, "refreshToken").expect("refresh cookie");
    let cookies = [("accessToken", access.value()), ("refreshToken", refresh.value())];

    let list = app.send(cookie_request(Method::GET, "/api/sessions", &cookies)).await;
    assert_eq!(list.status(), StatusCode::OK);
    let sessions = body_json(list).await;
    assert_eq!(sessions.as_array().map(Vec::len), Some(1));
    assert_eq!(sessions[0]["valid"], true);
    assert_eq!(sessions[0]["userAgent"], "integration-test");

    let logout = app.send(cookie_request(Method::DELETE, "/api/sessions", &cookies)).await;
    assert_eq!(logout.status(), StatusCode::OK);
    let cleared = set_cookie(&logout, "accessToken").expect("cleared access cookie");
    assert_eq!(cleared.value(), "");
    assert_eq!(
        body_json(logout).await,
        json!({ "accessToken": null, "refreshToken": null })
    );

    // The access token stays usable until expiry; the session is gone.
    let list = app.send(cookie_request(Method::GET, "/api/sessions", &cookies)).await;
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(body_json(list).await, json!([]));
}

#[tokio::test]
async fn bearer_header_authenticates() {
    let app = TestApp::new();
    let login = app.login("a@x.com").await;
    let token = body_json(login).await["accessToken"]
        .as_str()
        .expect("access token")
        .to_string();

    let req = Request::builder()
        .uri("/api/me")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = body_json(resp).await;
    assert_eq!(me["email"], "a@x.com");
    assert!(me["session"].is_string());
}

#[tokio::test]
async fn refresh_cookie_alone_reissues_access_token() {
    let app = TestApp::new();
    let login = app.login("a@x.com").await;
    let refresh = set_cookie(&login, "refreshToken").expect("refresh cookie");

    let resp = app
        .send(cookie_request(Method::GET, "/api/me", &[("refreshToken", refresh.value())]))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let reissued = set_cookie(&resp, "accessToken").expect("reissued access cookie");
    assert!(!reissued.value().is_empty());
    let header = resp
        .headers()
        .get("x-access-token")
        .and_then(|v| v.to_str().ok())
        .expect("x-access-token header");
    assert_eq!(header, reissued.value());

    // The reissued token authenticates on its own.
    let resp = app
        .send(cookie_request(Method::GET, "/api/me", &[("accessToken", reissued.value())]))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-access-token").is_none());
    assert!(resp.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn refresh_header_works_for_non_browser_clients() {
    let app = TestApp::new();
    let refresh = body_json(app.login("a@x.com").await).await["refreshToken"]
        .as_str()
        .expect("refresh token")
        .to_string();

    let req = Request::builder()
        .uri("/api/me")
        .header("x-refresh", refresh)
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-access-token").is_some());
}

#[tokio::test]
async fn revoked_session_cannot_refresh() {
    let app = TestApp::new();
    let login = app.login("a@x.com").await;
    let access = set_cookie(&login, "accessToken").expect("access cookie");
    let refresh = set_cookie(&login, "refreshToken").expect("refresh cookie");

    let logout = app
        .send(cookie_request(
            Method::DELETE,
            "/api/sessions",
            &[("accessToken", access.value()), ("refreshToken", refresh.value())],
        ))
        .await;
    assert_eq!(logout.status(), StatusCode::OK);

    let resp = app
        .send(cookie_request(Method::GET, "/api/me", &[("refreshToken", refresh.value())]))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get("x-access-token").is_none());
}

#[tokio::test]
async fn store_outage_on_refresh_degrades_to_anonymous() {
    let app = TestApp::new();
    let refresh = set_cookie(&app.login("a@x.com").await, "refreshToken").expect("refresh cookie");

    app.store.set_offline(true);
    let resp = app
        .send(cookie_request(Method::GET, "/api/me", &[("refreshToken", refresh.value())]))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_access_token_is_anonymous_even_with_refresh() {
    let app = TestApp::new();
    let refresh = set_cookie(&app.login("a@x.com").await, "refreshToken").expect("refresh cookie");

    let resp = app
        .send(cookie_request(
            Method::GET,
            "/api/me",
            &[("accessToken", "not.a.jwt"), ("refreshToken", refresh.value())],
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn out_of_range_token_ttl_is_a_startup_error() {
    for (access, refresh) in [
        (chrono::Duration::seconds(-60), chrono::Duration::days(365)),
        (chrono::Duration::zero(), chrono::Duration::days(365)),
        (chrono::Duration::minutes(15), chrono::Duration::seconds(100_000_000_000_000)),
    ] {
        let mut config = test_config();
        config.token_ttl.access = access;
        config.token_ttl.refresh = refresh;
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider {
            profile: google_profile(true),
            fail_exchange: false,
        });

        let result = AppState::new(config, store.clone(), store, provider);
        assert!(matches!(result, Err(AuthError::Config(_))));
    }
}
