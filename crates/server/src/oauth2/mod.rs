//! OAuth 2.0 authorization server core.
//!
//! Issues opaque bearer tokens for four grant types and validates them for
//! resource servers.
//!
//! ## Supported Grants
//!
//! - Authorization Code (consent at `/authorize`, redemption here)
//! - Resource Owner Password
//! - Client Credentials
//! - Refresh Token
//!
//! ## Endpoints
//!
//! - `POST /v1/oauth/tokens` - Token endpoint
//! - `POST /v1/oauth/introspect` - Token introspection (RFC 7662)

pub mod authorization_code;
pub mod client;
pub mod grants;
pub mod introspect;
pub mod password;
pub mod scope;
pub mod secret;
mod state;
pub mod tokens;
pub mod user;

use utoipa_axum::{router::OpenApiRouter, routes};

pub use password::SecretHash;
pub use secret::{Clock, ManualClock, OsSecretFactory, SecretFactory, SystemClock};
pub use state::OAuth2State;
pub use tokens::PrincipalKey;

/// OpenAPI tag for OAuth2 endpoints
pub const OAUTH2_TAG: &str = "OAuth2";

/// Token and introspection routes, nested under `/v1/oauth`.
pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(grants::tokens))
        .routes(routes!(introspect::introspect))
        .with_state(state)
}
