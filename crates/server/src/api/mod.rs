//! HTTP surface of the authorization server.
//!
//! This module is organized into submodules:
//! - `health` - Health check endpoint (/_ah/health)
//! - `openapi` - OpenAPI/Utoipa configuration
//!
//! The token and introspection endpoints live in [`crate::oauth2`], the
//! browser pages in [`crate::web`].

pub mod health;
pub mod openapi;

pub use health::MISC_TAG;

use crate::AppResources;
use crate::oauth2::{self, OAuth2State};
use crate::web;
use axum::{Router, extract::Request};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Build the full application router: API routes, browser pages, docs and
/// the request id / tracing / CORS layers.
pub fn app(state: OAuth2State) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/v1/oauth", oauth2::router(state.clone()))
        .merge(
            OpenApiRouter::new()
                .routes(routes!(health::health))
                .with_state(state.clone()),
        )
        .split_for_parts();

    router
        .merge(web::router(state))
        .merge(Redoc::with_url("/api-docs", api))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri().path(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(resources))]
pub async fn start_webserver(resources: AppResources) -> color_eyre::Result<()> {
    let state = resources.oauth2_state()?;
    let router = app(state);

    let addr = format!("0.0.0.0:{}", resources.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
