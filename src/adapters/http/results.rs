//! Handlers for the results and reports routes: by-channel read, listings,
//! delete, and share-token creation.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ports::ResultFilter;
use crate::usecases::{ChannelQuery, ReportListing, ResultListing, ShapedResult};

use super::{api_error, resolve_requester, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ChannelReadParams {
    /// Analyzer version tag; defaults to the gateway's configured version.
    pub v: Option<String>,
    /// Share token granting full access without a session.
    pub share: Option<String>,
    /// Explicit result id, scoped to the channel in the path.
    pub rid: Option<String>,
}

pub async fn result_by_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(params): Query<ChannelReadParams>,
) -> Result<Json<ShapedResult>, ApiError> {
    let requester = resolve_requester(&state, &headers).await?;
    let shaped = state
        .gateway
        .result_by_channel(
            &requester,
            &slug,
            &ChannelQuery {
                version: params.v,
                share_token: params.share,
                result_id: params.rid,
            },
        )
        .await
        .map_err(api_error)?;
    Ok(Json(shaped))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub channel: Option<String>,
    pub v: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

pub async fn list_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<ResultListing>, ApiError> {
    let requester = resolve_requester(&state, &headers).await?;
    let listing = state
        .gateway
        .list_results(
            &requester,
            ResultFilter {
                channel: params.channel,
                version: params.v,
            },
            params.limit,
            params.page,
        )
        .await
        .map_err(api_error)?;
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

pub async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<ReportListing>, ApiError> {
    let requester = resolve_requester(&state, &headers).await?;
    let listing = state
        .gateway
        .list_reports(&requester, params.limit, params.page)
        .await
        .map_err(api_error)?;
    Ok(Json(listing))
}

pub async fn delete_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let requester = resolve_requester(&state, &headers).await?;
    state
        .gateway
        .delete_result(&requester, &id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedResult {
    pub share_token: String,
}

pub async fn share_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SharedResult>, ApiError> {
    let requester = resolve_requester(&state, &headers).await?;
    let share_token = state
        .gateway
        .share_result(&requester, &id)
        .await
        .map_err(api_error)?;
    Ok(Json(SharedResult { share_token }))
}
