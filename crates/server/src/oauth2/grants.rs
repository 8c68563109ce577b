//! Grant dispatcher for `POST /v1/oauth/tokens`.

use crate::entity::{oauth_access_token, oauth_client, oauth_refresh_token};
use crate::error::{ErrorResponse, OAuthError};
use crate::oauth2::scope::scope_not_greater;
use crate::oauth2::{OAUTH2_TAG, OAuth2State};
use axum::{
    Form, Json,
    extract::State,
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Token endpoint form. Every field is optional so a missing `grant_type`
/// is reported as an invalid grant rather than a form rejection.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// One of `authorization_code`, `password`, `client_credentials`, `refresh_token`
    #[serde(default)]
    pub grant_type: Option<String>,
    /// Authorization code (authorization_code grant)
    #[serde(default)]
    pub code: Option<String>,
    /// Redirect URI the code was issued for (authorization_code grant)
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// User email (password grant)
    #[serde(default)]
    pub username: Option<String>,
    /// User password (password grant)
    #[serde(default)]
    pub password: Option<String>,
    /// Refresh token (refresh_token grant)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Space separated scope tokens
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Absent for the client_credentials grant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scope: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    Password,
    ClientCredentials,
    RefreshToken,
}

impl FromStr for GrantType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(GrantType::AuthorizationCode),
            "password" => Ok(GrantType::Password),
            "client_credentials" => Ok(GrantType::ClientCredentials),
            "refresh_token" => Ok(GrantType::RefreshToken),
            _ => Err(OAuthError::InvalidGrantType),
        }
    }
}

fn param(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// Token endpoint.
#[tracing::instrument(skip(state, headers, params), fields(grant_type = ?params.grant_type))]
#[utoipa::path(
    post,
    path = "/tokens",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Token",
    summary = "Issue tokens for a grant",
    description = "Exchanges a grant for an access token.\n\n\
                   **Supported grant types:**\n\
                   - `authorization_code`: redeem a single-use code issued at consent\n\
                   - `password`: resource owner email and password\n\
                   - `client_credentials`: the client acting on its own behalf (no refresh token)\n\
                   - `refresh_token`: obtain a new access token, optionally with a narrower scope\n\n\
                   **Client authentication:** HTTP Basic with the client id and secret.",
    request_body(
        content = TokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token request parameters"
    ),
    responses(
        (status = 200, description = "Tokens issued", body = AccessTokenResponse),
        (status = 400, description = "Invalid grant type or grant parameters", body = ErrorResponse),
        (status = 401, description = "Invalid client or user credentials", body = ErrorResponse),
    ),
    security(("client_basic" = []))
)]
pub async fn tokens(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
    Form(params): Form<TokenRequest>,
) -> Result<Json<AccessTokenResponse>, OAuthError> {
    let grant: GrantType = param(&params.grant_type).parse()?;
    let client = state.basic_auth_client(&headers).await?;

    let response = match grant {
        GrantType::AuthorizationCode => state.authorization_code_grant(&client, &params).await,
        GrantType::Password => state.password_grant(&client, &params).await,
        GrantType::ClientCredentials => state.client_credentials_grant(&client, &params).await,
        GrantType::RefreshToken => state.refresh_token_grant(&client, &params).await,
    }?;
    tracing::info!(client_id = %client.client_id, scope = %response.scope, "Issued access token");
    Ok(Json(response))
}

impl OAuth2State {
    async fn authorization_code_grant(
        &self,
        client: &oauth_client::Model,
        params: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let code = self
            .get_valid_authorization_code(param(&params.code), param(&params.redirect_uri), client)
            .await?;
        self.consume_authorization_code(&code).await?;

        let user = self.find_user_by_id(&code.user_id).await?;
        let (access, refresh) = self.login(client, Some(&user), &code.scope).await?;
        Ok(self.access_token_response(&access, Some(&refresh)))
    }

    async fn password_grant(
        &self,
        client: &oauth_client::Model,
        params: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let user = self
            .auth_user(param(&params.username), param(&params.password))
            .await
            .map_err(OAuthError::into_user_error)?;
        let scope = self.get_scope(param(&params.scope)).await?;
        let (access, refresh) = self.login(client, Some(&user), &scope).await?;
        Ok(self.access_token_response(&access, Some(&refresh)))
    }

    async fn client_credentials_grant(
        &self,
        client: &oauth_client::Model,
        params: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let scope = self.get_scope(param(&params.scope)).await?;
        let access = self
            .grant_access_token(client, None, self.lifetimes.access_token_lifetime, &scope)
            .await?;
        Ok(self.access_token_response(&access, None))
    }

    async fn refresh_token_grant(
        &self,
        client: &oauth_client::Model,
        params: &TokenRequest,
    ) -> Result<AccessTokenResponse, OAuthError> {
        let existing = self
            .get_valid_refresh_token(param(&params.refresh_token), client)
            .await?;
        let scope = self
            .get_refresh_token_scope(&existing, param(&params.scope))
            .await?;

        let user = match existing.user_id.as_deref() {
            Some(user_id) => Some(self.find_user_by_id(user_id).await?),
            None => None,
        };
        let (access, refresh) = self.login(client, user.as_ref(), &scope).await?;
        Ok(self.access_token_response(&access, Some(&refresh)))
    }

    /// The originally granted scope, or a validated subset of it.
    pub async fn get_refresh_token_scope(
        &self,
        refresh: &oauth_refresh_token::Model,
        requested: &str,
    ) -> Result<String, OAuthError> {
        if requested.is_empty() {
            return Ok(refresh.scope.clone());
        }
        let scope = self.get_scope(requested).await?;
        if !scope_not_greater(&scope, &refresh.scope) {
            return Err(OAuthError::RequestedScopeCannotBeGreater);
        }
        Ok(scope)
    }

    fn access_token_response(
        &self,
        access: &oauth_access_token::Model,
        refresh: Option<&oauth_refresh_token::Model>,
    ) -> AccessTokenResponse {
        AccessTokenResponse {
            access_token: access.access_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: self.lifetimes.access_token_lifetime,
            refresh_token: refresh.map(|r| r.token.clone()),
            scope: access.scope.clone(),
        }
    }
}
