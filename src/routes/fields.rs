//! Metadata field route handlers

use crate::auth::Claims;
use crate::error::{invalid_argument, ApiResult};
use crate::models::{AddFieldRequest, SuccessResponse, UpdateFieldRequest};
use crate::registry::MetadataField;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

pub async fn list_fields(
    State(state): State<SharedState>,
) -> Json<SuccessResponse<Vec<MetadataField>>> {
    let fields = state.registry.list_fields().await;
    Json(SuccessResponse::with_data(
        format!("{} registered field(s)", fields.len()),
        fields,
    ))
}

pub async fn add_field(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddFieldRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<MetadataField>>)> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let field = state
        .registry
        .add_field(&claims.caller(), &payload.name, payload.required)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Field '{}' registered", field.name),
            field,
        )),
    ))
}

pub async fn get_field(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Json<SuccessResponse<MetadataField>>> {
    let field = state.registry.get_field(&name).await?;
    Ok(Json(SuccessResponse::with_data(format!("Field '{}'", name), field)))
}

/// Toggle the active and required flags
pub async fn update_field(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
    Json(payload): Json<UpdateFieldRequest>,
) -> ApiResult<Json<SuccessResponse<MetadataField>>> {
    let field = state
        .registry
        .update_field(&claims.caller(), &name, payload.is_active, payload.is_required)
        .await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Field '{}' updated", name),
        field,
    )))
}
