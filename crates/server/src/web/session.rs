//! Cookie-backed session.
//!
//! The session lives entirely in one signed cookie: a base64url JSON blob
//! holding the logged-in [`UserSession`] and a queue of flash messages.
//! Nothing is written back until [`SessionService::save`] hands the updated
//! jar to the response.

use crate::error::OAuthError;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, SignedCookieJar};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::convert::Infallible;

pub const SESSION_COOKIE: &str = "oauth2_server_session";

/// Cookie lifetime in seconds.
pub const SESSION_MAX_AGE: i64 = 3_600_000;

/// The principal a browser is logged in as, plus its token pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Public client id the login happened through
    pub client_id: String,
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserSession>,
    #[serde(default, skip_serializing_if = "VecDeque::is_empty")]
    flashes: VecDeque<String>,
}

impl SessionData {
    fn decode(value: &str) -> Option<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(value)
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json))
    }
}

#[derive(Debug)]
pub struct SessionService {
    jar: SignedCookieJar,
    data: SessionData,
}

impl SessionService {
    /// Load the session from the jar, or start an empty one when the cookie
    /// is absent, unsigned or unreadable.
    pub fn start(jar: SignedCookieJar) -> Self {
        let data = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| SessionData::decode(cookie.value()))
            .unwrap_or_default();
        Self { jar, data }
    }

    pub fn get_user_session(&self) -> Result<UserSession, OAuthError> {
        self.data
            .user
            .clone()
            .ok_or(OAuthError::UserSessionNotFound)
    }

    pub fn set_user_session(&mut self, session: UserSession) {
        self.data.user = Some(session);
    }

    pub fn clear_user_session(&mut self) {
        self.data.user = None;
    }

    pub fn add_flash(&mut self, message: impl Into<String>) {
        self.data.flashes.push_back(message.into());
    }

    /// Oldest pending flash message, removed from the queue.
    pub fn pop_flash(&mut self) -> Option<String> {
        self.data.flashes.pop_front()
    }

    /// Write the session into the jar. Return the jar from the handler so
    /// the `Set-Cookie` header reaches the browser.
    pub fn save(self) -> SignedCookieJar {
        let value = match self.data.encode() {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to encode session: {}", e);
                return self.jar;
            }
        };
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::seconds(SESSION_MAX_AGE))
            .build();
        self.jar.add(cookie)
    }
}

impl<S> FromRequestParts<S> for SessionService
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, Key::from_ref(state));
        Ok(Self::start(jar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};

    fn key() -> Key {
        Key::from(&[7u8; 64][..])
    }

    fn user_session() -> UserSession {
        UserSession {
            client_id: "acme".into(),
            user_id: "u1".into(),
            access_token: "a".into(),
            refresh_token: "r".into(),
        }
    }

    /// The jar a saved session hands back carries the signed cookie the
    /// browser would replay on the next request.
    fn next_request(jar: SignedCookieJar) -> SessionService {
        SessionService::start(jar)
    }

    #[test]
    fn empty_jar_starts_empty_session() {
        let session = SessionService::start(SignedCookieJar::new(key()));
        assert!(matches!(
            session.get_user_session(),
            Err(OAuthError::UserSessionNotFound)
        ));
    }

    #[test]
    fn user_session_survives_round_trip() {
        let mut session = SessionService::start(SignedCookieJar::new(key()));
        session.set_user_session(user_session());
        let restored = next_request(session.save());
        assert_eq!(restored.get_user_session().unwrap(), user_session());
    }

    #[test]
    fn flashes_pop_in_order_and_persist_removal() {
        let mut session = SessionService::start(SignedCookieJar::new(key()));
        session.add_flash("first");
        session.add_flash("second");

        let mut restored = next_request(session.save());
        assert_eq!(restored.pop_flash().as_deref(), Some("first"));

        let mut restored = next_request(restored.save());
        assert_eq!(restored.pop_flash().as_deref(), Some("second"));
        assert_eq!(restored.pop_flash(), None);
    }

    #[test]
    fn clearing_removes_user_session() {
        let mut session = SessionService::start(SignedCookieJar::new(key()));
        session.set_user_session(user_session());
        session.clear_user_session();
        let restored = next_request(session.save());
        assert!(restored.get_user_session().is_err());
    }

    #[test]
    fn unsigned_cookie_is_ignored() {
        // A well-formed payload for user "u1" without a signature.
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static(
                "oauth2_server_session=eyJ1c2VyIjp7ImNsaWVudF9pZCI6ImFjbWUiLCJ1c2VyX2lkIjoidTEiLCJhY2Nlc3NfdG9rZW4iOiJhIiwicmVmcmVzaF90b2tlbiI6InIifX0",
            ),
        );
        let session = SessionService::start(SignedCookieJar::from_headers(&headers, key()));
        assert!(session.get_user_session().is_err());
    }
}
