//! SeaORM entities for the credential collections.

pub mod oauth_access_token;
pub mod oauth_authorization_code;
pub mod oauth_client;
pub mod oauth_refresh_token;
pub mod oauth_role;
pub mod oauth_scope;
pub mod oauth_user;
