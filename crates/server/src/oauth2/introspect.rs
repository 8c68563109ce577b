//! Token introspection for resource servers, `POST /v1/oauth/introspect`.

use crate::entity::{oauth_access_token, oauth_refresh_token};
use crate::error::{ErrorResponse, OAuthError};
use crate::oauth2::{OAUTH2_TAG, OAuth2State};
use axum::{Form, Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct IntrospectRequest {
    /// The token to inspect
    #[serde(default)]
    pub token: Option<String>,
    /// `access_token` (default) or `refresh_token`
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// Introspection result. Inactive tokens carry nothing but `active: false`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct IntrospectResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Public id of the client the token was issued to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Email of the resource owner; absent for client credentials tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl IntrospectResponse {
    pub fn inactive() -> Self {
        Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    pub fn parse(hint: Option<&str>) -> Result<Self, OAuthError> {
        match hint.unwrap_or_default() {
            "" | "access_token" => Ok(TokenTypeHint::AccessToken),
            "refresh_token" => Ok(TokenTypeHint::RefreshToken),
            _ => Err(OAuthError::TokenHintInvalid),
        }
    }
}

/// Introspection endpoint.
#[tracing::instrument(skip(state, headers, params))]
#[utoipa::path(
    post,
    path = "/introspect",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Introspect",
    summary = "Report whether a token is currently active",
    description = "Implements RFC 7662 token introspection for resource servers.\n\n\
                   An unknown or expired token, or a refresh token issued to another client, yields `{\"active\": false}` \
                   with status 200. Introspecting an access token slides the expiry of the session's refresh token.",
    request_body(
        content = IntrospectRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token to introspect"
    ),
    responses(
        (status = 200, description = "Introspection result", body = IntrospectResponse),
        (status = 400, description = "Missing token or unknown token_type_hint", body = ErrorResponse),
        (status = 401, description = "Invalid client credentials", body = ErrorResponse),
    ),
    security(("client_basic" = []))
)]
pub async fn introspect(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
    Form(params): Form<IntrospectRequest>,
) -> Result<Json<IntrospectResponse>, OAuthError> {
    let client = state.basic_auth_client(&headers).await?;

    let token = params.token.as_deref().unwrap_or_default();
    if token.is_empty() {
        return Err(OAuthError::TokenMissing);
    }
    let hint = TokenTypeHint::parse(params.token_type_hint.as_deref())?;

    let result = match hint {
        TokenTypeHint::AccessToken => match state.authenticate(token).await {
            Ok(access) => state.access_token_introspection(&access).await,
            Err(e) => Err(e),
        },
        TokenTypeHint::RefreshToken => match state.get_valid_refresh_token(token, &client).await {
            Ok(refresh) => state.refresh_token_introspection(&refresh).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(response) => Ok(Json(response)),
        Err(e) if e.is_internal() => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "Introspected token is not active");
            Ok(Json(IntrospectResponse::inactive()))
        }
    }
}

impl OAuth2State {
    async fn active_response(
        &self,
        client_id: &str,
        user_id: Option<&str>,
        scope: &str,
        expires_at: OffsetDateTime,
    ) -> Result<IntrospectResponse, OAuthError> {
        let client = self.find_client_by_id(client_id).await?;
        let username = match user_id {
            Some(user_id) => Some(self.find_user_by_id(user_id).await?.email),
            None => None,
        };
        Ok(IntrospectResponse {
            active: true,
            scope: Some(scope.to_string()),
            client_id: Some(client.client_id),
            username,
            token_type: Some("Bearer".to_string()),
            exp: Some(expires_at.unix_timestamp()),
        })
    }

    pub async fn access_token_introspection(
        &self,
        access: &oauth_access_token::Model,
    ) -> Result<IntrospectResponse, OAuthError> {
        self.active_response(
            &access.client_id,
            access.user_id.as_deref(),
            &access.scope,
            access.expires_at,
        )
        .await
    }

    pub async fn refresh_token_introspection(
        &self,
        refresh: &oauth_refresh_token::Model,
    ) -> Result<IntrospectResponse, OAuthError> {
        self.active_response(
            &refresh.client_id,
            refresh.user_id.as_deref(),
            &refresh.scope,
            refresh.expires_at,
        )
        .await
    }
}
