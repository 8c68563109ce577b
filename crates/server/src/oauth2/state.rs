//! OAuth2 state management.
//!
//! [`OAuth2State`] is the single handler state for the authorization server.
//! The token engine, the authenticators and the scope calculator are all
//! `impl OAuth2State` blocks spread over the sibling modules.

use crate::config::OAuthConfig;
use crate::oauth2::secret::{Clock, OsSecretFactory, SecretFactory, SystemClock};
use crate::store::Store;
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

#[derive(Clone)]
pub struct OAuth2State {
    pub store: Store,
    /// Token and code lifetimes in seconds
    pub lifetimes: OAuthConfig,
    clock: Arc<dyn Clock>,
    secrets: Arc<dyn SecretFactory>,
    cookie_key: Key,
}

impl std::fmt::Debug for OAuth2State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2State")
            .field("store", &self.store)
            .field("lifetimes", &self.lifetimes)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl OAuth2State {
    pub fn new(db: Arc<DatabaseConnection>, lifetimes: OAuthConfig, cookie_key: Key) -> Self {
        Self {
            store: Store::new(db),
            lifetimes,
            clock: Arc::new(SystemClock),
            secrets: Arc::new(OsSecretFactory),
            cookie_key,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_secrets(mut self, secrets: Arc<dyn SecretFactory>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Current time at second resolution.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// `now + seconds`.
    pub fn expires_in(&self, seconds: i64) -> OffsetDateTime {
        self.now() + Duration::seconds(seconds)
    }

    /// Generate a fresh opaque token.
    pub fn generate_token(&self) -> String {
        self.secrets.generate()
    }

    /// Row identifiers are random UUIDs.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl FromRef<OAuth2State> for Key {
    fn from_ref(state: &OAuth2State) -> Self {
        state.cookie_key.clone()
    }
}
