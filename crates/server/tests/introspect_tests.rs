//! Introspection endpoint tests.

mod common;

use axum::http::{StatusCode, header};
use common::{TestContext, basic};
use serde_json::{Value, json};
use time::Duration;

const INTROSPECT: &str = "/v1/oauth/introspect";

#[tokio::test]
async fn test_introspect_active_access_token() {
    let ctx = TestContext::new().await;
    let (access, _) = ctx
        .state
        .login(&ctx.acme, Some(&ctx.alice), "read write")
        .await
        .expect("login");

    let response = ctx
        .server()
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[("token", access.access_token.as_str())])
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "active": true,
            "scope": "read write",
            "client_id": "acme",
            "username": "alice@example.com",
            "token_type": "Bearer",
            "exp": access.expires_at.unix_timestamp(),
        })
    );
}

#[tokio::test]
async fn test_introspect_client_credentials_token_has_no_username() {
    let ctx = TestContext::new().await;
    let access = ctx
        .state
        .grant_access_token(&ctx.svc, None, 3600, "read")
        .await
        .expect("grant");

    let response = ctx
        .server()
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("svc", "svc-secret"))
        .form(&[
            ("token", access.access_token.as_str()),
            ("token_type_hint", "access_token"),
        ])
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["active"], true);
    assert_eq!(body["client_id"], "svc");
    assert!(body.get("username").is_none());
}

#[tokio::test]
async fn test_introspect_expired_access_token() {
    let ctx = TestContext::new().await;
    let (access, _) = ctx
        .state
        .login(&ctx.acme, Some(&ctx.alice), "read")
        .await
        .expect("login");
    ctx.clock.advance(Duration::seconds(3601));

    let response = ctx
        .server()
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[("token", access.access_token.as_str())])
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "active": false }));
}

#[tokio::test]
async fn test_introspect_refresh_token() {
    let ctx = TestContext::new().await;
    let (_, refresh) = ctx
        .state
        .login(&ctx.acme, Some(&ctx.alice), "read")
        .await
        .expect("login");
    let server = ctx.server();

    let response = server
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[
            ("token", refresh.token.as_str()),
            ("token_type_hint", "refresh_token"),
        ])
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["active"], true);
    assert_eq!(body["exp"], refresh.expires_at.unix_timestamp());

    // Refresh tokens are bound to the client that holds them
    let response = server
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("svc", "svc-secret"))
        .form(&[
            ("token", refresh.token.as_str()),
            ("token_type_hint", "refresh_token"),
        ])
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "active": false }));
}

#[tokio::test]
async fn test_introspect_slides_refresh_expiry() {
    let ctx = TestContext::new().await;
    let (access, refresh) = ctx
        .state
        .login(&ctx.acme, Some(&ctx.alice), "read")
        .await
        .expect("login");
    ctx.clock.advance(Duration::seconds(600));

    ctx.server()
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[("token", access.access_token.as_str())])
        .await
        .assert_status_ok();

    let after = ctx
        .state
        .get_valid_refresh_token(&refresh.token, &ctx.acme)
        .await
        .expect("refresh token");
    assert!(after.expires_at > refresh.expires_at);
}

#[tokio::test]
async fn test_introspect_request_errors() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[("token", "")])
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "token missing");

    let response = server
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[("token", "abc"), ("token_type_hint", "id_token")])
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid token hint");

    let response = server
        .post(INTROSPECT)
        .add_header(header::AUTHORIZATION, basic("acme", "nope"))
        .form(&[("token", "abc")])
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
