//! Consent page and the authorization decision.
//!
//! `GET /authorize` renders the consent page. `POST /authorize` issues an
//! authorization code (query string redirect) or, for the implicit flow, an
//! access token (fragment redirect). Parameters are read from the form body
//! first and the query string second.

use crate::entity::oauth_client;
use crate::error::OAuthError;
use crate::oauth2::OAuth2State;
use crate::oauth2::scope::ScopeInfo;
use crate::web::middleware::LoggedInUser;
use crate::web::redirect::{found, path_with_query, with_fragment, with_query};
use askama::Template;
use axum::{
    Extension, Form,
    extract::{OriginalUri, Query, State},
    response::{Html, IntoResponse, Response},
};
use std::collections::HashMap;
use url::Url;

#[derive(Template)]
#[template(path = "authorize.html")]
struct AuthorizeTemplate {
    client_name: String,
    user_email: String,
    scopes: Vec<ScopeInfo>,
    redirect_host: String,
    action: String,
    logout_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    Code,
    Token,
}

impl ResponseType {
    pub fn parse(value: &str) -> Result<Self, OAuthError> {
        match value {
            "code" => Ok(ResponseType::Code),
            "token" => Ok(ResponseType::Token),
            _ => Err(OAuthError::IncorrectResponseType),
        }
    }
}

/// A validated authorization request: where to send the browser and how.
#[derive(Debug)]
pub struct AuthorizeRequest {
    pub response_type: ResponseType,
    /// The redirect exactly as requested; stored on issued codes
    pub redirect_uri: String,
    redirect: Url,
    pub state: Option<String>,
}

impl AuthorizeRequest {
    /// Validate `response_type` and `redirect_uri` against the client. Both
    /// failures are reported directly, never by redirect.
    pub fn parse(
        params: &AuthorizeParams<'_>,
        client: &oauth_client::Model,
    ) -> Result<Self, OAuthError> {
        let response_type = ResponseType::parse(params.get("response_type").unwrap_or_default())?;
        let redirect_uri = params
            .get("redirect_uri")
            .unwrap_or(client.redirect_url.as_str())
            .to_string();
        let redirect = Url::parse(&redirect_uri).map_err(|_| OAuthError::InvalidRedirectUri)?;
        if !redirect_matches_client(&redirect, client) {
            return Err(OAuthError::InvalidRedirectUri);
        }
        Ok(Self {
            response_type,
            redirect_uri,
            redirect,
            state: params.get("state").map(str::to_string),
        })
    }

    /// Redirect carrying `params` (plus `state`) in the query for the code
    /// flow or in the fragment for the implicit flow.
    fn redirect_with(&self, params: &[(&str, &str)]) -> Response {
        let mut params = params.to_vec();
        if let Some(state) = self.state.as_deref() {
            params.push(("state", state));
        }
        let location = match self.response_type {
            ResponseType::Code => with_query(&self.redirect, &params),
            ResponseType::Token => with_fragment(&self.redirect, &params),
        };
        found(&location)
    }

    fn error_redirect(&self, error: &str) -> Response {
        self.redirect_with(&[("error", error)])
    }
}

/// Same scheme, host, port and path as the registered redirect URL.
fn redirect_matches_client(redirect: &Url, client: &oauth_client::Model) -> bool {
    let Ok(registered) = Url::parse(&client.redirect_url) else {
        return false;
    };
    redirect.scheme() == registered.scheme()
        && redirect.host_str() == registered.host_str()
        && redirect.port_or_known_default() == registered.port_or_known_default()
        && redirect.path() == registered.path()
}

/// Request parameters, form body first and query string second. Empty
/// values count as absent.
pub struct AuthorizeParams<'a> {
    form: &'a HashMap<String, String>,
    query: &'a HashMap<String, String>,
}

impl<'a> AuthorizeParams<'a> {
    pub fn new(form: &'a HashMap<String, String>, query: &'a HashMap<String, String>) -> Self {
        Self { form, query }
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.form
            .get(name)
            .filter(|value| !value.is_empty())
            .or_else(|| self.query.get(name).filter(|value| !value.is_empty()))
            .map(String::as_str)
    }
}

#[tracing::instrument(skip(state, client, logged_in), fields(client_id = %client.client_id))]
pub async fn authorize_form(
    State(state): State<OAuth2State>,
    Extension(client): Extension<oauth_client::Model>,
    Extension(logged_in): Extension<LoggedInUser>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, OAuthError> {
    let no_form = HashMap::new();
    let params = AuthorizeParams::new(&no_form, &query);
    let request = AuthorizeRequest::parse(&params, &client)?;

    let scope = match params.get("scope") {
        Some(scope) => scope.to_string(),
        None => state.get_default_scope().await?,
    };
    let query_string = uri.query().unwrap_or_default();
    let page = AuthorizeTemplate {
        client_name: client.display_name().to_string(),
        user_email: logged_in.user.email.clone(),
        scopes: state.describe_scope(&scope).await?,
        redirect_host: request.redirect.host_str().unwrap_or_default().to_string(),
        action: path_with_query("/authorize", query_string),
        logout_url: path_with_query("/logout", query_string),
    };
    Ok(Html(page.render()?).into_response())
}

#[tracing::instrument(skip(state, client, logged_in, form), fields(client_id = %client.client_id))]
pub async fn authorize(
    State(state): State<OAuth2State>,
    Extension(client): Extension<oauth_client::Model>,
    Extension(logged_in): Extension<LoggedInUser>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, OAuthError> {
    let params = AuthorizeParams::new(&form, &query);
    let request = AuthorizeRequest::parse(&params, &client)?;

    if params.get("allow").is_none() {
        tracing::info!(user_id = %logged_in.user.id, "User denied authorization");
        return Ok(request.error_redirect("access_denied"));
    }

    let scope = match state.get_scope(params.get("scope").unwrap_or_default()).await {
        Ok(scope) => scope,
        Err(e) if e.is_internal() => {
            tracing::error!("Failed to resolve scope: {}", e);
            return Ok(request.error_redirect("server_error"));
        }
        Err(_) => return Ok(request.error_redirect("invalid_scope")),
    };

    let granted = match request.response_type {
        ResponseType::Code => state
            .grant_authorization_code(
                &client,
                &logged_in.user,
                state.lifetimes.auth_code_lifetime,
                &request.redirect_uri,
                &scope,
            )
            .await
            .map(|code| request.redirect_with(&[("code", code.code.as_str())])),
        ResponseType::Token => {
            let lifetime = state.lifetimes.access_token_lifetime;
            state
                .grant_access_token(&client, Some(&logged_in.user), lifetime, &scope)
                .await
                .map(|access| {
                    let expires_in = lifetime.to_string();
                    request.redirect_with(&[
                        ("access_token", access.access_token.as_str()),
                        ("expires_in", expires_in.as_str()),
                        ("token_type", "Bearer"),
                        ("scope", access.scope.as_str()),
                    ])
                })
        }
    };

    match granted {
        Ok(response) => {
            tracing::info!(user_id = %logged_in.user.id, "User granted authorization");
            Ok(response)
        }
        Err(e) => {
            tracing::error!("Failed to grant authorization: {}", e);
            Ok(request.error_redirect("server_error"))
        }
    }
}
