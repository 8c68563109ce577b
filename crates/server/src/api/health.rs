//! Health check endpoint.

use crate::oauth2::OAuth2State;
use axum::{extract::State, http::StatusCode};

/// Tag for OpenAPI documentation.
pub const MISC_TAG: &str = "Miscellaneous";

/// Health check endpoint. Pings the record store.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    method(get, head, post),
    path = "/_ah/health",
    tag = MISC_TAG,
    operation_id = "Health Check",
    summary = "Service health check",
    description = "Round-trips to the database and reports whether the service can serve requests.\n\n\
                   **Use cases:**\n\
                   - Kubernetes liveness/readiness probes\n\
                   - Load balancer health checks\n\n\
                   Supports GET, HEAD and POST.",
    responses(
        (status = 200, description = "Service is healthy", body = str, content_type = "text/plain", example = "ok"),
        (status = 503, description = "Database unreachable", body = str, content_type = "text/plain", example = "database unavailable")
    )
)]
pub async fn health(State(state): State<OAuth2State>) -> (StatusCode, &'static str) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!("Health check database ping failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}
