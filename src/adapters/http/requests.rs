//! Handlers for the analysis-requests routes: create + poll.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::ReportLanguage;
use crate::usecases::{CreateRequestInput, PollOutcome};

use super::{api_error, resolve_requester, ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub channel_input: String,
    pub report_language: ReportLanguage,
    pub depth: u32,
    #[serde(default)]
    pub purpose_hint: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRequest {
    pub request_id: String,
}

pub async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<CreatedRequest>), ApiError> {
    let requester = resolve_requester(&state, &headers).await?;
    let request_id = state
        .gateway
        .create_request(
            &requester,
            CreateRequestInput {
                channel_input: body.channel_input,
                language: body.report_language,
                depth: body.depth,
                purpose_hint: body.purpose_hint,
            },
        )
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(CreatedRequest { request_id })))
}

pub async fn poll_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PollOutcome>, ApiError> {
    let requester = resolve_requester(&state, &headers).await?;
    let outcome = state
        .gateway
        .poll_request(&requester, &id)
        .await
        .map_err(api_error)?;
    Ok(Json(outcome))
}
