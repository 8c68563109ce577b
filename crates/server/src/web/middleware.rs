//! Request guards for the interactive pages.
//!
//! Each guard resolves something a handler needs and hands it on as a typed
//! request extension: [`require_client`] inserts the `oauth_client::Model`
//! named by the `client_id` query parameter, [`require_login`] inserts a
//! [`LoggedInUser`].

use crate::entity::{oauth_client, oauth_user};
use crate::error::{ErrorResponse, OAuthError};
use crate::oauth2::OAuth2State;
use crate::web::redirect::{found, login_redirect, query_param};
use crate::web::session::{SessionService, UserSession};
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The authenticated browser user for this request.
#[derive(Clone, Debug)]
pub struct LoggedInUser {
    pub user: oauth_user::Model,
    pub session: UserSession,
}

/// Load the client named by `?client_id=`. Unknown clients are a bad request.
pub async fn require_client(
    State(state): State<OAuth2State>,
    mut request: Request,
    next: Next,
) -> Response {
    let client_id = query_param(request.uri().query(), "client_id").unwrap_or_default();
    match state.find_client_by_client_id(&client_id).await {
        Ok(client) => {
            request.extensions_mut().insert::<oauth_client::Model>(client);
            next.run(request).await
        }
        Err(OAuthError::ClientNotFound) => {
            tracing::debug!(client_id = %client_id, "Unknown client on interactive route");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: OAuthError::ClientNotFound.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Re-authenticate the session on every request, refreshing its token pair
/// when the access token has lapsed. Anything else sends the browser to
/// `/login`.
pub async fn require_login(
    State(state): State<OAuth2State>,
    mut session: SessionService,
    mut request: Request,
    next: Next,
) -> Response {
    let back_to_login = login_redirect(request.uri().path(), request.uri().query());

    let Ok(mut user_session) = session.get_user_session() else {
        return found(&back_to_login);
    };

    let (user, refreshed) = match state.reauthenticate(&mut user_session).await {
        Ok(result) => result,
        Err(e) => {
            if e.is_internal() {
                tracing::error!("Failed to re-authenticate session: {}", e);
            } else {
                tracing::debug!(error = %e, "Session no longer valid");
            }
            return found(&back_to_login);
        }
    };

    request.extensions_mut().insert(LoggedInUser {
        user,
        session: user_session.clone(),
    });
    let response = next.run(request).await;

    if refreshed {
        session.set_user_session(user_session);
        (session.save(), response).into_response()
    } else {
        response
    }
}

impl OAuth2State {
    /// Check a cookie session's access token, falling back to its refresh
    /// token. Returns the user and whether the token pair was replaced.
    pub async fn reauthenticate(
        &self,
        session: &mut UserSession,
    ) -> Result<(oauth_user::Model, bool), OAuthError> {
        let refreshed = match self.authenticate(&session.access_token).await {
            Ok(access) if access.user_id.as_deref() == Some(session.user_id.as_str()) => false,
            Err(e) if e.is_internal() => return Err(e),
            _ => {
                let client = self.find_client_by_client_id(&session.client_id).await?;
                let refresh = self
                    .get_valid_refresh_token(&session.refresh_token, &client)
                    .await?;
                if refresh.user_id.as_deref() != Some(session.user_id.as_str()) {
                    return Err(OAuthError::RefreshTokenNotFound);
                }
                let user = self.find_user_by_id(&session.user_id).await?;
                let (access, refresh) = self.login(&client, Some(&user), &refresh.scope).await?;
                session.access_token = access.access_token;
                session.refresh_token = refresh.token;
                tracing::debug!(user_id = %user.id, "Refreshed session tokens");
                return Ok((user, true));
            }
        };
        let user = self.find_user_by_id(&session.user_id).await?;
        Ok((user, refreshed))
    }
}
