//! Edit proposal route handlers

use crate::auth::Claims;
use crate::error::{invalid_argument, ApiResult};
use crate::models::{
    entry_key, KeyQuery, MetadataUpdateRequest, PageQuery, RejectRequest, SuccessResponse,
};
use crate::registry::{EditPage, EditProposal};
use crate::routes::DEFAULT_PAGE_LIMIT;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use validator::Validate;

/// Propose a metadata change to an approved entry
pub async fn propose_edit(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
    Json(payload): Json<MetadataUpdateRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<EditProposal>>)> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let key = entry_key(&address, &query)?;
    let proposal = state
        .registry
        .propose_edit(&claims.caller(), &key, payload.updates)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Edit {} proposed for {}", proposal.id, key),
            proposal,
        )),
    ))
}

/// Active proposals for one entry, ascending by id
pub async fn list_edits(
    State(state): State<SharedState>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let key = entry_key(&address, &query)?;
    let edits = state.registry.list_edits(&key).await;
    Ok(Json(SuccessResponse::with_data(
        format!("{} active edit(s) for {}", edits.len(), key),
        json!({ "count": edits.len(), "edits": edits }),
    )))
}

pub async fn edit_count(
    State(state): State<SharedState>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let key = entry_key(&address, &query)?;
    let count = state.registry.active_proposal_count(&key).await;
    Ok(Json(SuccessResponse::with_data(
        format!("{} active edit(s) for {}", count, key),
        json!({ "count": count }),
    )))
}

pub async fn get_edit(
    State(state): State<SharedState>,
    Path((address, id)): Path<(String, u64)>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<EditProposal>>> {
    let key = entry_key(&address, &query)?;
    let proposal = state.registry.get_proposal(&key, id).await?;
    Ok(Json(SuccessResponse::with_data(format!("Edit {} for {}", id, key), proposal)))
}

/// Apply one proposal; every other proposal for the entry is discarded
pub async fn accept_edit(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((address, id)): Path<(String, u64)>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<EditProposal>>> {
    let key = entry_key(&address, &query)?;
    let proposal = state.registry.accept_edit(&claims.caller(), &key, id).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Edit {} accepted for {}", id, key),
        proposal,
    )))
}

pub async fn reject_edit(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((address, id)): Path<(String, u64)>,
    Query(query): Query<KeyQuery>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<Json<SuccessResponse<EditProposal>>> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let key = entry_key(&address, &query)?;
    let proposal = state
        .registry
        .reject_edit(&claims.caller(), &key, id, payload.reason)
        .await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Edit {} rejected for {}", id, key),
        proposal,
    )))
}

/// Every active proposal across the registry
pub async fn list_all_edits(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Json<SuccessResponse<EditPage>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let page = state.registry.list_all_edits(query.offset, limit).await;
    Json(SuccessResponse::with_data(
        format!("{} of {} active edits", page.edits.len(), page.total),
        page,
    ))
}
