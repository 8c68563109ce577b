//! Login, signup and logout pages.

use crate::entity::{oauth_client, oauth_role};
use crate::error::OAuthError;
use crate::oauth2::user::MIN_PASSWORD_LENGTH;
use crate::oauth2::{OAuth2State, PrincipalKey};
use crate::web::redirect::{found, is_local_path, path_with_query, query_param, query_without};
use crate::web::session::{SessionService, UserSession};
use askama::Template;
use axum::{
    Extension, Form,
    extract::{OriginalUri, State},
    http::Uri,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

/// Where a successful login goes when the request does not say.
const DEFAULT_LOGIN_REDIRECT: &str = "/authorize";

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    action: String,
    signup_url: String,
    client_name: Option<String>,
    flash: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    action: String,
    login_url: String,
    min_password_length: usize,
    flash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Path and query of the current request, for posting a form back to itself.
fn same_page(uri: &Uri) -> String {
    path_with_query(uri.path(), uri.query().unwrap_or_default())
}

/// `login_redirect_uri` if it is a local path, else `/authorize`, with the
/// rest of the query carried along.
fn login_success_target(query: Option<&str>) -> String {
    let target = query_param(query, "login_redirect_uri")
        .filter(|target| is_local_path(target))
        .unwrap_or_else(|| DEFAULT_LOGIN_REDIRECT.to_string());
    path_with_query(&target, &query_without(query, "login_redirect_uri"))
}

/// Send the browser back where it came from with a flash message.
fn back_with_flash(mut session: SessionService, uri: &Uri, error: &OAuthError) -> Response {
    if error.is_internal() {
        tracing::error!("Interactive request failed: {}", error);
    }
    session.add_flash(error.public_message());
    (session.save(), found(&same_page(uri))).into_response()
}

#[tracing::instrument(skip(state, session))]
pub async fn login_form(
    State(state): State<OAuth2State>,
    OriginalUri(uri): OriginalUri,
    mut session: SessionService,
) -> Result<Response, OAuthError> {
    let query = uri.query().unwrap_or_default();
    let client_name = match query_param(uri.query(), "client_id") {
        Some(client_id) => state
            .find_client_by_client_id(&client_id)
            .await
            .ok()
            .map(|client| client.display_name().to_string()),
        None => None,
    };
    let page = LoginTemplate {
        action: same_page(&uri),
        signup_url: path_with_query("/signup", query),
        client_name,
        flash: session.pop_flash(),
    };
    let html = page.render()?;
    Ok((session.save(), Html(html)).into_response())
}

#[tracing::instrument(skip(state, client, session, form), fields(client_id = %client.client_id))]
pub async fn login(
    State(state): State<OAuth2State>,
    Extension(client): Extension<oauth_client::Model>,
    OriginalUri(uri): OriginalUri,
    mut session: SessionService,
    Form(form): Form<LoginForm>,
) -> Response {
    let requested_scope = form
        .scope
        .clone()
        .filter(|scope| !scope.is_empty())
        .or_else(|| query_param(uri.query(), "scope"))
        .unwrap_or_default();

    match state
        .log_in(&client, &form.email, &form.password, &requested_scope)
        .await
    {
        Ok(user_session) => {
            tracing::info!(user_id = %user_session.user_id, "User logged in");
            session.set_user_session(user_session);
            (session.save(), found(&login_success_target(uri.query()))).into_response()
        }
        Err(e) => back_with_flash(session, &uri, &e),
    }
}

#[tracing::instrument(skip(session))]
pub async fn signup_form(
    OriginalUri(uri): OriginalUri,
    mut session: SessionService,
) -> Result<Response, OAuthError> {
    let page = SignupTemplate {
        action: same_page(&uri),
        login_url: path_with_query("/login", uri.query().unwrap_or_default()),
        min_password_length: MIN_PASSWORD_LENGTH,
        flash: session.pop_flash(),
    };
    let html = page.render()?;
    Ok((session.save(), Html(html)).into_response())
}

#[tracing::instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<OAuth2State>,
    OriginalUri(uri): OriginalUri,
    mut session: SessionService,
    Form(form): Form<SignupForm>,
) -> Response {
    match state.user_exists(&form.email).await {
        Ok(false) => {}
        Ok(true) => {
            session.add_flash("Email taken");
            return (session.save(), found(&same_page(&uri))).into_response();
        }
        Err(e) => return back_with_flash(session, &uri, &e),
    }

    match state
        .create_user(oauth_role::USER, &form.email, &form.password)
        .await
    {
        Ok(_) => {
            let login = path_with_query("/login", uri.query().unwrap_or_default());
            (session.save(), found(&login)).into_response()
        }
        Err(e) => back_with_flash(session, &uri, &e),
    }
}

/// Revoke the session's tokens and forget the logged-in user.
#[tracing::instrument(skip(state, session))]
pub async fn logout(
    State(state): State<OAuth2State>,
    OriginalUri(uri): OriginalUri,
    mut session: SessionService,
) -> Response {
    if let Ok(user_session) = session.get_user_session() {
        let key = PrincipalKey {
            client_id: &user_session.client_id,
            user_id: Some(&user_session.user_id),
        };
        if let Err(e) = state.clear_user_tokens(key).await {
            tracing::error!("Failed to clear user tokens on logout: {}", e);
        }
    }
    session.clear_user_session();
    let login = path_with_query("/login", uri.query().unwrap_or_default());
    (session.save(), found(&login)).into_response()
}

impl OAuth2State {
    /// Password login for the interactive flow: authenticate, settle the
    /// scope and issue the token pair the cookie session will carry.
    async fn log_in(
        &self,
        client: &oauth_client::Model,
        email: &str,
        password: &str,
        scope: &str,
    ) -> Result<UserSession, OAuthError> {
        let user = self
            .auth_user(email, password)
            .await
            .map_err(OAuthError::into_user_error)?;
        let scope = self.get_scope(scope).await?;
        let (access, refresh) = self.login(client, Some(&user), &scope).await?;
        Ok(UserSession {
            client_id: client.client_id.clone(),
            user_id: user.id,
            access_token: access.access_token,
            refresh_token: refresh.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_success_defaults_to_authorize() {
        assert_eq!(
            login_success_target(Some("client_id=acme&scope=read")),
            "/authorize?client_id=acme&scope=read"
        );
        assert_eq!(login_success_target(None), "/authorize");
    }

    #[test]
    fn login_success_follows_local_redirect() {
        assert_eq!(
            login_success_target(Some("client_id=acme&login_redirect_uri=%2Fauthorize")),
            "/authorize?client_id=acme"
        );
        assert_eq!(
            login_success_target(Some(
                "client_id=acme&login_redirect_uri=https%3A%2F%2Fevil.example%2F"
            )),
            "/authorize?client_id=acme"
        );
    }
}
