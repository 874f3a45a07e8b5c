//! JWT token management
//!
//! Handles creation and validation of caller tokens.

use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token expiration for development tokens (1 hour)
pub const DEV_TOKEN_EXPIRATION_MINUTES: i64 = 60;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (caller id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Token response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Create a signed token for `caller_id`
pub fn create_token(
    secret: &str,
    caller_id: &str,
    ttl_minutes: i64,
) -> Result<TokenResponse, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: caller_id.to_string(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
        iat: now.timestamp(),
    };

    let access_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: ttl_minutes * 60,
    })
}

/// Decode and validate a JWT token
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".to_string())
        }
        jsonwebtoken::errors::ErrorKind::InvalidToken => {
            AppError::Unauthorized("Invalid token".to_string())
        }
        _ => AppError::Unauthorized(format!("Token validation failed: {}", e)),
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized("Token has no subject".to_string()));
    }
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let token = create_token(SECRET, "alice", 5).unwrap();
        let claims = decode_token(SECRET, &token.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(token.expires_in, 300);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = create_token(SECRET, "alice", 5).unwrap();
        assert!(matches!(
            decode_token("other-secret", &token.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let token = create_token(SECRET, "alice", -10).unwrap();
        assert!(matches!(
            decode_token(SECRET, &token.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
