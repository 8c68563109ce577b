//! Token endpoint tests.
//!
//! Drive `POST /v1/oauth/tokens` through the full router.

mod common;

use axum::http::{StatusCode, header};
use common::{ACME_REDIRECT, TestContext, basic};
use oauth2_server::oauth2::grants::AccessTokenResponse;
use serde_json::Value;
use std::future::IntoFuture;

const TOKENS: &str = "/v1/oauth/tokens";

async fn password_login(ctx: &TestContext) -> AccessTokenResponse {
    let response = ctx
        .server()
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[
            ("grant_type", "password"),
            ("username", "alice@example.com"),
            ("password", "hunter22"),
        ])
        .await;
    response.assert_status_ok();
    response.json::<AccessTokenResponse>()
}

// =============================================================================
// Password grant
// =============================================================================

#[tokio::test]
async fn test_password_grant_happy_path() {
    let ctx = TestContext::new().await;
    let body = password_login(&ctx).await;

    assert!(body.access_token.len() >= 32);
    assert_eq!(body.token_type, "Bearer");
    assert_eq!(body.expires_in, 3600);
    assert!(body.refresh_token.as_deref().is_some_and(|r| r.len() >= 32));
    assert_eq!(body.scope, "read write");
}

#[tokio::test]
async fn test_password_grant_reuses_refresh_token() {
    let ctx = TestContext::new().await;
    let first = password_login(&ctx).await;
    let second = password_login(&ctx).await;

    assert_ne!(first.access_token, second.access_token);
    assert_eq!(first.refresh_token, second.refresh_token);
}

#[tokio::test]
async fn test_password_grant_hides_which_credential_was_wrong() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    for (username, password) in [
        ("alice@example.com", "wrong-password"),
        ("nobody@example.com", "hunter22"),
    ] {
        let response = server
            .post(TOKENS)
            .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid username or password");
    }
}

#[tokio::test]
async fn test_password_grant_rejects_unknown_scope() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server()
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[
            ("grant_type", "password"),
            ("username", "alice@example.com"),
            ("password", "hunter22"),
            ("scope", "read launch_missiles"),
        ])
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid scope");
}

// =============================================================================
// Client authentication and dispatch
// =============================================================================

#[tokio::test]
async fn test_invalid_grant_type() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    for grant_type in ["implicit", ""] {
        let response = server
            .post(TOKENS)
            .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
            .form(&[("grant_type", grant_type)])
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid grant type");
    }
}

#[tokio::test]
async fn test_bad_client_credentials() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    for (client_id, secret) in [("acme", "wrong"), ("nobody", "s3cr3t")] {
        let response = server
            .post(TOKENS)
            .add_header(header::AUTHORIZATION, basic(client_id, secret))
            .form(&[("grant_type", "client_credentials")])
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=oauth2_server"
        );
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid client ID or secret");
    }

    let response = server
        .post(TOKENS)
        .form(&[("grant_type", "client_credentials")])
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Client credentials grant
// =============================================================================

#[tokio::test]
async fn test_client_credentials_omits_refresh_token() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server()
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("svc", "svc-secret"))
        .form(&[("grant_type", "client_credentials"), ("scope", "read")])
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert!(body["access_token"].as_str().is_some_and(|t| t.len() >= 32));
    assert_eq!(body["scope"], "read");
    assert!(body.get("refresh_token").is_none());
}

// =============================================================================
// Refresh token grant
// =============================================================================

#[tokio::test]
async fn test_refresh_rejected_on_scope_escalation() {
    let ctx = TestContext::new().await;
    let login = password_login(&ctx).await;

    let response = ctx
        .server()
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", login.refresh_token.as_deref().unwrap()),
            ("scope", "read write admin"),
        ])
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body, serde_json::json!({ "error": "requested scope cannot be greater" }));
}

#[tokio::test]
async fn test_refresh_with_narrower_scope() {
    let ctx = TestContext::new().await;
    let login = password_login(&ctx).await;

    let response = ctx
        .server()
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", login.refresh_token.as_deref().unwrap()),
            ("scope", "read"),
        ])
        .await;
    response.assert_status_ok();
    let body: AccessTokenResponse = response.json();
    assert_eq!(body.scope, "read");
    assert_ne!(body.access_token, login.access_token);
    assert_eq!(body.refresh_token, login.refresh_token);
}

#[tokio::test]
async fn test_refresh_token_of_other_client_is_unknown() {
    let ctx = TestContext::new().await;
    let login = password_login(&ctx).await;

    let response = ctx
        .server()
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("svc", "svc-secret"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", login.refresh_token.as_deref().unwrap()),
        ])
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "refresh token not found");
}

// =============================================================================
// Authorization code grant
// =============================================================================

#[tokio::test]
async fn test_authorization_code_redeemed_once() {
    let ctx = TestContext::new().await;
    let code = ctx
        .state
        .grant_authorization_code(&ctx.acme, &ctx.alice, 600, ACME_REDIRECT, "read")
        .await
        .expect("grant code");
    let server = ctx.server();
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.code.as_str()),
        ("redirect_uri", ACME_REDIRECT),
    ];

    let first = server
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&form)
        .await;
    first.assert_status_ok();
    let body: AccessTokenResponse = first.json();
    assert_eq!(body.scope, "read");
    assert!(body.refresh_token.is_some());

    let second = server
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&form)
        .await;
    second.assert_status_bad_request();
    let body: Value = second.json();
    assert_eq!(body["error"], "authorization code not found");
}

#[tokio::test]
async fn test_concurrent_code_redemption_succeeds_once() {
    let ctx = TestContext::new().await;
    let code = ctx
        .state
        .grant_authorization_code(&ctx.acme, &ctx.alice, 600, ACME_REDIRECT, "read")
        .await
        .expect("grant code");
    let server = ctx.server();
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.code.as_str()),
        ("redirect_uri", ACME_REDIRECT),
    ];

    let (a, b) = tokio::join!(
        server
            .post(TOKENS)
            .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
            .form(&form)
            .into_future(),
        server
            .post(TOKENS)
            .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
            .form(&form)
            .into_future(),
    );

    let mut statuses = [a.status_code(), b.status_code()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
    let failed = if a.status_code() == StatusCode::OK { b } else { a };
    let body: Value = failed.json();
    assert_eq!(body["error"], "authorization code not found");
}

#[tokio::test]
async fn test_authorization_code_redirect_must_match() {
    let ctx = TestContext::new().await;
    let code = ctx
        .state
        .grant_authorization_code(&ctx.acme, &ctx.alice, 600, ACME_REDIRECT, "read")
        .await
        .expect("grant code");

    let response = ctx
        .server()
        .post(TOKENS)
        .add_header(header::AUTHORIZATION, basic("acme", "s3cr3t"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.code.as_str()),
            ("redirect_uri", "https://acme.example/elsewhere"),
        ])
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid redirect URI");
}
