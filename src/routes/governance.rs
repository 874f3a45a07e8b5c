//! Governance route handlers: roles and policy migration

use crate::auth::Claims;
use crate::error::{invalid_argument, ApiResult};
use crate::models::{MessageResponse, RoleRequest, StageMigrationRequest, SuccessResponse};
use crate::registry::{Caller, PolicyStatus};
use crate::state::SharedState;
use axum::{extract::State, Extension, Json};
use validator::Validate;

pub async fn policy_status(
    State(state): State<SharedState>,
) -> Json<SuccessResponse<PolicyStatus>> {
    let status = state.registry.policy_status().await;
    Json(SuccessResponse::with_data(
        format!("Active policy '{}'", status.active.name),
        status,
    ))
}

pub async fn grant_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let member = Caller::new(payload.member);
    state
        .registry
        .grant_role(&claims.caller(), member.clone(), payload.role)
        .await?;
    Ok(Json(MessageResponse::new(format!(
        "Role {} granted to {}",
        payload.role, member
    ))))
}

pub async fn revoke_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let member = Caller::new(payload.member);
    state
        .registry
        .revoke_role(&claims.caller(), &member, payload.role)
        .await?;
    Ok(Json(MessageResponse::new(format!(
        "Role {} revoked from {}",
        payload.role, member
    ))))
}

/// Stage a new curator policy; the current one stays in charge until completion
pub async fn stage_migration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StageMigrationRequest>,
) -> ApiResult<Json<SuccessResponse<PolicyStatus>>> {
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let status = state
        .registry
        .stage_policy_migration(&claims.caller(), Box::new(payload.into_policy()))
        .await?;
    Ok(Json(SuccessResponse::with_data("Policy migration staged", status)))
}

pub async fn complete_migration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<PolicyStatus>>> {
    let status = state.registry.complete_policy_migration(&claims.caller()).await?;
    Ok(Json(SuccessResponse::with_data("Policy migration completed", status)))
}

pub async fn cancel_migration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<PolicyStatus>>> {
    let status = state.registry.cancel_policy_migration(&claims.caller()).await?;
    Ok(Json(SuccessResponse::with_data("Policy migration cancelled", status)))
}
