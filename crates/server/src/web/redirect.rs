//! Redirect and query string helpers for the interactive pages.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use url::{Url, form_urlencoded};

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// First value of `name` in a raw query string.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// The query string with every `name` pair removed.
pub fn query_without(query: Option<&str>, name: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key != name {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.finish()
}

/// Append `query` to a local path, keeping any query the path already has.
pub fn path_with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else if path.contains('?') {
        format!("{path}&{query}")
    } else {
        format!("{path}?{query}")
    }
}

/// Only same-origin absolute paths are followed after login.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

/// Login page for a request that needs a session, remembering where to come back to.
pub fn login_redirect(path: &str, query: Option<&str>) -> String {
    let rest = query_without(query, "login_redirect_uri");
    let target = format!("login_redirect_uri={}", urlencoding::encode(path));
    path_with_query("/login", &join_query(&rest, &target))
}

fn join_query(first: &str, second: &str) -> String {
    if first.is_empty() {
        second.to_string()
    } else {
        format!("{first}&{second}")
    }
}

/// `url` with `params` added to its query string. Existing pairs are kept.
pub fn with_query(url: &Url, params: &[(&str, &str)]) -> String {
    let mut url = url.clone();
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    url.into()
}

/// `url` with `params` encoded into its fragment.
pub fn with_fragment(url: &Url, params: &[(&str, &str)]) -> String {
    let mut url = url.clone();
    let fragment = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    url.set_fragment(Some(&fragment));
    url.into()
}
