//! Inbound HTTP adapter: axum router, handlers, and the error envelope.
//!
//! Handlers resolve the caller's identity once and pass an explicit
//! `Requester` into the gateway service; no ambient auth state.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::domain::{DomainError, Requester};
use crate::ports::SessionPort;
use crate::usecases::GatewayService;

mod requests;
mod results;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayService>,
    pub sessions: Arc<dyn SessionPort>,
}

/// Wire error envelope: `{ error: <code>, details?: <string> }`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analysis-requests", post(requests::create_request))
        .route("/analysis-requests/{id}", get(requests::poll_request))
        .route("/results/by-channel/{slug}", get(results::result_by_channel))
        .route("/results", get(results::list_results))
        .route("/results/{id}", delete(results::delete_result))
        .route("/results/{id}/share", post(results::share_result))
        .route("/reports", get(results::list_reports))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Map a domain error onto a status code and the error envelope. Upstream
/// details survive as the `details` field; credentials never reach it
/// (adapters strip them before the error is built).
pub(crate) fn api_error(err: DomainError) -> ApiError {
    let (status, code, details) = match err {
        DomainError::Validation(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg)),
        DomainError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),
        DomainError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg)),
        DomainError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg)),
        DomainError::Cms(msg) | DomainError::Session(msg) | DomainError::Transport(msg) => {
            warn!(error = %msg, "upstream failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", Some(msg))
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            details,
        }),
    )
}

/// Resolve the caller from the Authorization header. A missing or invalid
/// bearer token means anonymous; only provider transport failures error out.
pub(crate) async fn resolve_requester(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Requester, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(Requester::Anonymous);
    };
    match state.sessions.verify(token).await {
        Ok(Some(user_id)) => Ok(Requester::Authenticated(user_id)),
        Ok(None) => Ok(Requester::Anonymous),
        Err(e) => Err(api_error(e)),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}
