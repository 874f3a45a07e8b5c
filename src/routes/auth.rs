//! Authentication route handlers

use crate::auth::{create_token, TokenResponse, DEV_TOKEN_EXPIRATION_MINUTES};
use crate::error::{invalid_argument, ApiResult, AppError};
use crate::models::{DevTokenRequest, SuccessResponse};
use crate::state::SharedState;
use axum::{extract::State, Json};
use tracing::warn;
use validator::Validate;

/// Mint a bearer token for any caller id. Disabled unless `ALLOW_DEV_TOKENS=true`.
pub async fn dev_token(
    State(state): State<SharedState>,
    Json(payload): Json<DevTokenRequest>,
) -> ApiResult<Json<SuccessResponse<TokenResponse>>> {
    if !state.allow_dev_tokens {
        return Err(AppError::NotFound("Development tokens are disabled".to_string()));
    }
    payload.validate().map_err(|e| invalid_argument(e.to_string()))?;

    let ttl = payload.ttl_minutes.unwrap_or(DEV_TOKEN_EXPIRATION_MINUTES);
    let token = create_token(&state.jwt_secret, payload.caller.trim(), ttl)?;
    warn!("Issued development token for '{}'", payload.caller.trim());
    Ok(Json(SuccessResponse::with_data("Token issued", token)))
}
