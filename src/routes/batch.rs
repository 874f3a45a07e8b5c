//! Batch route handlers
//!
//! Each returns `200` with a per-item report even when some items failed;
//! only a malformed or oversized batch is rejected as a whole.

use crate::auth::Claims;
use crate::batch::BatchReport;
use crate::error::ApiResult;
use crate::models::{
    BatchAddRequest, BatchApproveRequest, BatchEditsRequest, BatchRejectRequest, SuccessResponse,
};
use crate::state::SharedState;
use axum::{extract::State, Extension, Json};

fn summarize(operation: &str, report: BatchReport) -> Json<SuccessResponse<BatchReport>> {
    let message = format!(
        "Batch {}: {} of {} item(s) succeeded",
        operation, report.summary.succeeded, report.summary.total
    );
    Json(SuccessResponse::with_data(message, report))
}

pub async fn batch_add(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchAddRequest>,
) -> ApiResult<Json<SuccessResponse<BatchReport>>> {
    let report = state.batch().batch_add(&claims.caller(), payload.items).await?;
    Ok(summarize("add", report))
}

pub async fn batch_approve(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchApproveRequest>,
) -> ApiResult<Json<SuccessResponse<BatchReport>>> {
    let report = state.batch().batch_approve(&claims.caller(), payload.keys).await?;
    Ok(summarize("approve", report))
}

pub async fn batch_reject(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchRejectRequest>,
) -> ApiResult<Json<SuccessResponse<BatchReport>>> {
    let report = state.batch().batch_reject(&claims.caller(), payload.items).await?;
    Ok(summarize("reject", report))
}

pub async fn batch_accept_edits(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchEditsRequest>,
) -> ApiResult<Json<SuccessResponse<BatchReport>>> {
    let report = state
        .batch()
        .batch_accept_edits(&claims.caller(), payload.items)
        .await?;
    Ok(summarize("accept-edits", report))
}

pub async fn batch_reject_edits(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BatchEditsRequest>,
) -> ApiResult<Json<SuccessResponse<BatchReport>>> {
    let report = state
        .batch()
        .batch_reject_edits(&claims.caller(), payload.items)
        .await?;
    Ok(summarize("reject-edits", report))
}
