use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Realm advertised in `WWW-Authenticate` on client authentication failures.
pub const REALM: &str = "oauth2_server";

/// Every failure the authorization server can produce.
///
/// Credential-related variants (`ClientNotFound`, `InvalidClientSecret`,
/// `UserNotFound`, `UserPasswordNotSet`, `InvalidUserPassword`) stay inside
/// the authenticators; callers collapse them with [`OAuthError::into_client_error`]
/// and [`OAuthError::into_user_error`] before anything reaches a response.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid grant type")]
    InvalidGrantType,
    #[error("invalid client ID or secret")]
    InvalidClientIdOrSecret,
    #[error("invalid username or password")]
    InvalidUsernameOrPassword,
    #[error("client not found")]
    ClientNotFound,
    #[error("invalid client secret")]
    InvalidClientSecret,
    #[error("client ID taken")]
    ClientIdTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("user password not set")]
    UserPasswordNotSet,
    #[error("invalid user password")]
    InvalidUserPassword,
    #[error("password must be at least {0} characters long")]
    PasswordTooShort(usize),
    #[error("username taken")]
    UsernameTaken,
    #[error("cannot set empty username")]
    CannotSetEmptyUsername,
    #[error("access token not found")]
    AccessTokenNotFound,
    #[error("access token expired")]
    AccessTokenExpired,
    #[error("refresh token not found")]
    RefreshTokenNotFound,
    #[error("refresh token expired")]
    RefreshTokenExpired,
    #[error("authorization code not found")]
    AuthorizationCodeNotFound,
    #[error("authorization code expired")]
    AuthorizationCodeExpired,
    #[error("invalid redirect URI")]
    InvalidRedirectUri,
    #[error("invalid scope")]
    InvalidScope,
    #[error("requested scope cannot be greater")]
    RequestedScopeCannotBeGreater,
    #[error("token missing")]
    TokenMissing,
    #[error("invalid token hint")]
    TokenHintInvalid,
    #[error("response type not one of token or code")]
    IncorrectResponseType,
    #[error("user session not found")]
    UserSessionNotFound,
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable error message
    #[schema(example = "invalid grant type")]
    pub error: String,
}

impl OAuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidClientIdOrSecret
            | OAuthError::InvalidUsernameOrPassword
            | OAuthError::ClientNotFound
            | OAuthError::InvalidClientSecret
            | OAuthError::UserNotFound
            | OAuthError::UserPasswordNotSet
            | OAuthError::InvalidUserPassword
            | OAuthError::AccessTokenNotFound
            | OAuthError::AccessTokenExpired
            | OAuthError::RefreshTokenExpired
            | OAuthError::UserSessionNotFound => StatusCode::UNAUTHORIZED,
            OAuthError::InvalidGrantType
            | OAuthError::ClientIdTaken
            | OAuthError::PasswordTooShort(_)
            | OAuthError::UsernameTaken
            | OAuthError::CannotSetEmptyUsername
            | OAuthError::RefreshTokenNotFound
            | OAuthError::AuthorizationCodeNotFound
            | OAuthError::AuthorizationCodeExpired
            | OAuthError::InvalidRedirectUri
            | OAuthError::InvalidScope
            | OAuthError::RequestedScopeCannotBeGreater
            | OAuthError::TokenMissing
            | OAuthError::TokenHintInvalid
            | OAuthError::IncorrectResponseType => StatusCode::BAD_REQUEST,
            OAuthError::Database(_)
            | OAuthError::PasswordHash(_)
            | OAuthError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the variant describes an infrastructure failure rather than a bad request.
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Collapse client lookup and secret failures so clients cannot be enumerated.
    pub fn into_client_error(self) -> Self {
        match self {
            OAuthError::ClientNotFound | OAuthError::InvalidClientSecret => {
                OAuthError::InvalidClientIdOrSecret
            }
            other => other,
        }
    }

    /// Collapse user lookup and password failures so users cannot be enumerated.
    pub fn into_user_error(self) -> Self {
        match self {
            OAuthError::UserNotFound
            | OAuthError::UserPasswordNotSet
            | OAuthError::InvalidUserPassword => OAuthError::InvalidUsernameOrPassword,
            other => other,
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_internal() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }

        let mut response = (
            status,
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response();

        if matches!(self, OAuthError::InvalidClientIdOrSecret) {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer realm={REALM}")) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}
