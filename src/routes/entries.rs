//! Entry lifecycle and metadata route handlers

use crate::auth::Claims;
use crate::error::{invalid_argument, ApiResult};
use crate::models::{
    entry_key, AddEntryRequest, KeyQuery, ListEntriesQuery, MessageResponse, MetadataUpdateRequest,
    RejectRequest, SetValueRequest, SuccessResponse,
};
use crate::registry::{Entry, EntryCounts, EntryPage, MetadataValue};
use crate::routes::DEFAULT_PAGE_LIMIT;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::debug;
use validator::Validate;

/// Submit an entry for review
pub async fn add_entry(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddEntryRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Entry>>)> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let (key, submitter, metadata) = payload.into_parts();
    let entry = state
        .registry
        .add_entry(&claims.caller(), key, submitter, metadata)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Entry {} submitted for review", entry.key),
            entry,
        )),
    ))
}

/// List one status partition
pub async fn list_entries(
    State(state): State<SharedState>,
    Query(query): Query<ListEntriesQuery>,
) -> ApiResult<Json<SuccessResponse<EntryPage>>> {
    let status = query.status()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    debug!("Listing {} entries (offset {}, limit {})", status, query.offset, limit);

    let page = state.registry.list_entries(status, query.offset, limit).await;
    Ok(Json(SuccessResponse::with_data(
        format!("{} of {} {} entries", page.entries.len(), page.total, status),
        page,
    )))
}

pub async fn entry_counts(State(state): State<SharedState>) -> Json<SuccessResponse<EntryCounts>> {
    let counts = state.registry.counts().await;
    Json(SuccessResponse::with_data("Entry counts", counts))
}

pub async fn get_entry(
    State(state): State<SharedState>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<Entry>>> {
    let key = entry_key(&address, &query)?;
    let entry = state.registry.get_entry(&key).await?;
    Ok(Json(SuccessResponse::with_data(format!("Entry {}", key), entry)))
}

pub async fn approve_entry(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<Entry>>> {
    let key = entry_key(&address, &query)?;
    let entry = state.registry.approve_entry(&claims.caller(), &key).await?;
    Ok(Json(SuccessResponse::with_data(format!("Entry {} approved", key), entry)))
}

pub async fn reject_entry(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<Json<SuccessResponse<Entry>>> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let key = entry_key(&address, &query)?;
    let entry = state
        .registry
        .reject_entry(&claims.caller(), &key, payload.reason)
        .await?;
    Ok(Json(SuccessResponse::with_data(format!("Entry {} rejected", key), entry)))
}

/// Every registered field's value for an entry
pub async fn get_metadata(
    State(state): State<SharedState>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<Vec<MetadataValue>>>> {
    let key = entry_key(&address, &query)?;
    let values = state.registry.get_all_values(&key).await?;
    Ok(Json(SuccessResponse::with_data(format!("Metadata for {}", key), values)))
}

pub async fn get_metadata_value(
    State(state): State<SharedState>,
    Path((address, field)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<SuccessResponse<MetadataValue>>> {
    let key = entry_key(&address, &query)?;
    let value = state.registry.get_value(&key, &field).await?;
    Ok(Json(SuccessResponse::with_data(format!("{} for {}", field, key), value)))
}

/// Write metadata directly, bypassing the edit flow
pub async fn set_metadata(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(address): Path<String>,
    Query(query): Query<KeyQuery>,
    Json(payload): Json<MetadataUpdateRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let key = entry_key(&address, &query)?;
    let count = payload.updates.len();
    state
        .registry
        .set_values(&claims.caller(), &key, payload.updates)
        .await?;
    Ok(Json(MessageResponse::new(format!(
        "{} metadata value(s) written for {}",
        count, key
    ))))
}

pub async fn set_metadata_value(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((address, field)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
    Json(payload): Json<SetValueRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let key = entry_key(&address, &query)?;
    state
        .registry
        .set_value(&claims.caller(), &key, &field, &payload.value)
        .await?;
    Ok(Json(MessageResponse::new(format!("{} written for {}", field, key))))
}
