//! Shared fixtures: an in-memory SQLite schema, seeded catalog rows, the
//! `acme` and `svc` clients and the user `alice@example.com`.

#![allow(dead_code)]

use axum::http::HeaderValue;
use axum_extra::extract::cookie::Key;
use axum_test::TestServer;
use base64::Engine;
use oauth2_server::config::OAuthConfig;
use oauth2_server::entity::{oauth_client, oauth_role, oauth_user};
use oauth2_server::oauth2::{ManualClock, OAuth2State};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use std::sync::Arc;

pub const ACME_REDIRECT: &str = "https://acme.example/cb";

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE oauth_clients (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL UNIQUE,
        client_secret TEXT NOT NULL,
        redirect_url TEXT NOT NULL,
        app_name TEXT NULL,
        scopes TEXT NULL,
        publisher_name TEXT NULL,
        website TEXT NULL,
        contact_email TEXT NULL,
        created_at TEXT NOT NULL
    );"#,
    r#"CREATE TABLE oauth_roles (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );"#,
    r#"CREATE TABLE oauth_users (
        id TEXT PRIMARY KEY,
        role_id TEXT NOT NULL REFERENCES oauth_roles(id),
        email TEXT NOT NULL UNIQUE,
        password TEXT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );"#,
    r#"CREATE TABLE oauth_scopes (
        scope TEXT PRIMARY KEY,
        description TEXT NULL,
        is_default INTEGER NOT NULL DEFAULT 0
    );"#,
    r#"CREATE TABLE oauth_authorization_codes (
        id TEXT PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        client_id TEXT NOT NULL REFERENCES oauth_clients(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES oauth_users(id) ON DELETE CASCADE,
        redirect_url TEXT NOT NULL,
        scope TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    );"#,
    r#"CREATE TABLE oauth_access_tokens (
        id TEXT PRIMARY KEY,
        access_token TEXT NOT NULL UNIQUE,
        client_id TEXT NOT NULL REFERENCES oauth_clients(id) ON DELETE CASCADE,
        user_id TEXT NULL REFERENCES oauth_users(id) ON DELETE CASCADE,
        scope TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    );"#,
    r#"CREATE TABLE oauth_refresh_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        client_id TEXT NOT NULL REFERENCES oauth_clients(id) ON DELETE CASCADE,
        user_id TEXT NULL REFERENCES oauth_users(id) ON DELETE CASCADE,
        scope TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    );"#,
    r#"CREATE UNIQUE INDEX idx_oauth_refresh_tokens_principal
        ON oauth_refresh_tokens (client_id, user_id);"#,
    r#"INSERT INTO oauth_roles (id, name) VALUES
        ('superuser', 'Superuser'),
        ('user', 'User');"#,
    r#"INSERT INTO oauth_scopes (scope, description, is_default) VALUES
        ('read', 'Read your data', 1),
        ('write', 'Modify your data', 1),
        ('admin', 'Administer the service', 0);"#,
];

/// Create a test database with the authorization server tables
pub async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.expect("connect");
    for statement in SCHEMA {
        db.execute(Statement::from_string(DbBackend::Sqlite, *statement))
            .await
            .expect("apply schema");
    }
    db
}

pub struct TestContext {
    pub state: OAuth2State,
    pub clock: Arc<ManualClock>,
    pub acme: oauth_client::Model,
    pub svc: oauth_client::Model,
    pub alice: oauth_user::Model,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = Arc::new(create_test_db().await);
        let clock = Arc::new(ManualClock::starting_now());
        let state = OAuth2State::new(db, OAuthConfig::default(), Key::from(&[7u8; 64][..]))
            .with_clock(clock.clone());

        let acme = state
            .create_client("acme", "s3cr3t", ACME_REDIRECT)
            .await
            .expect("create acme client");
        let svc = state
            .create_client("svc", "svc-secret", "https://svc.example/cb")
            .await
            .expect("create svc client");
        let alice = state
            .create_user(oauth_role::USER, "alice@example.com", "hunter22")
            .await
            .expect("create alice");

        Self {
            state,
            clock,
            acme,
            svc,
            alice,
        }
    }

    /// Full application router, as served in production.
    pub fn server(&self) -> TestServer {
        TestServer::new(oauth2_server::api::app(self.state.clone())).expect("create test server")
    }

    /// Same router, keeping cookies between requests like a browser.
    pub fn browser(&self) -> TestServer {
        TestServer::builder()
            .save_cookies()
            .build(oauth2_server::api::app(self.state.clone()))
            .expect("create test server")
    }
}

/// `Authorization: Basic` value for a client id and secret.
pub fn basic(client_id: &str, secret: &str) -> HeaderValue {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{client_id}:{secret}"));
    HeaderValue::from_str(&format!("Basic {encoded}")).expect("header value")
}

/// The `Location` header of a redirect response.
pub fn location(response: &axum_test::TestResponse) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}
