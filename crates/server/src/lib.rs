//! An OAuth 2.0 authorization server.
//!
//! Issues opaque bearer tokens to registered clients through the
//! authorization code, password, client credentials and refresh token
//! grants, validates them for resource servers via introspection, and runs
//! the browser login and consent pages that feed the code and implicit flows.

use std::sync::Arc;

use axum_extra::extract::cookie::Key;
use sea_orm::DatabaseConnection;

use crate::config::{AppConfig, ConfigError};
use crate::oauth2::OAuth2State;

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod oauth2;
pub mod store;
pub mod web;

#[derive(Clone, Debug)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}

impl AppResources {
    /// Handler state for the configured database and lifetimes, signing
    /// session cookies with `session_secret`.
    pub fn oauth2_state(&self) -> Result<OAuth2State, ConfigError> {
        let key = Key::try_from(self.config.session_secret.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("session_secret is not a usable signing key: {e}"))
        })?;
        Ok(OAuth2State::new(
            self.db.clone(),
            self.config.oauth.clone(),
            key,
        ))
    }
}
