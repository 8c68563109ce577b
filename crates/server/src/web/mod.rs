//! Browser-facing pages: login, signup, logout and consent.
//!
//! ## Routes
//!
//! - `GET|POST /login` - password login (`POST` needs `?client_id=`)
//! - `GET|POST /signup` - account creation
//! - `GET /logout` - revoke the session's tokens and forget the user
//! - `GET|POST /authorize` - consent, needs a logged-in session and `?client_id=`

pub mod authorize;
pub mod login;
pub mod middleware;
pub mod redirect;
pub mod session;

use crate::oauth2::OAuth2State;
use axum::{Router, handler::Handler, middleware::from_fn_with_state, routing::get};

pub use middleware::LoggedInUser;
pub use session::{SessionService, UserSession};

pub fn router(state: OAuth2State) -> Router {
    let authorize = Router::new()
        .route(
            "/authorize",
            get(authorize::authorize_form).post(authorize::authorize),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_client))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_login));

    Router::new()
        .route(
            "/login",
            get(login::login_form).post(
                login::login.layer(from_fn_with_state(state.clone(), middleware::require_client)),
            ),
        )
        .route("/signup", get(login::signup_form).post(login::signup))
        .route("/logout", get(login::logout))
        .merge(authorize)
        .with_state(state)
}
