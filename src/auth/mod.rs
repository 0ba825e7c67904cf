//! Caller identity extraction.
//!
//! Token issuance lives in the external identity provider; this module
//! only verifies bearer tokens (HS256, `sub` = user id) and reads the
//! anonymous session key. Handlers choose between two extractors:
//! [`CallerIdentity`] for routes that serve both anonymous and
//! authenticated callers (basket, order creation), and
//! [`AuthenticatedUser`] for routes that require an identified caller
//! (payment, profile, order history).

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{errors::ServiceError, AppState};

/// Header carrying the anonymous cart key for unauthenticated callers.
pub const SESSION_HEADER: &str = "x-session-id";

/// Claim structure for externally issued JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time
    pub exp: i64,
}

/// Identity of the inbound caller: an authenticated user id, an
/// anonymous session key, or neither. The anonymous and identified cart
/// paths stay separate all the way down; see `services::cart`.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: Option<i32>,
    pub session_id: Option<String>,
}

impl CallerIdentity {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Extractor that rejects with 401 unless the caller presented a valid
/// bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: i32,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Verify a bearer token and extract the user id from its `sub` claim.
pub fn verify_token(token: &str, secret: &str) -> Result<i32, ServiceError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

    data.claims
        .sub
        .parse::<i32>()
        .map_err(|_| ServiceError::Unauthorized("token subject is not a user id".to_string()))
}

/// Mint a short-lived token for the given user id. The production issuer
/// is the external identity provider; this helper exists for tests and
/// local tooling.
pub fn mint_token(user_id: i32, secret: &str, ttl_secs: i64) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap_or_default()
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A present-but-invalid token is an error rather than a silent
        // downgrade to anonymous.
        let user_id = match bearer_token(parts) {
            Some(token) => Some(verify_token(token, &state.config.jwt_secret)?),
            None => None,
        };

        let session_id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(CallerIdentity {
            user_id,
            session_id,
        })
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;
        let user_id = verify_token(token, &state.config.jwt_secret)?;
        Ok(AuthenticatedUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes_only";

    #[test]
    fn mint_and_verify_round_trip() {
        let token = mint_token(42, SECRET, 60);
        assert_eq!(verify_token(&token, SECRET).unwrap(), 42);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint_token(42, SECRET, 60);
        assert!(verify_token(&token, "another_secret_entirely_for_testing").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = mint_token(42, SECRET, -120);
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let claims = Claims {
            sub: "alice".to_string(),
            exp: chrono::Utc::now().timestamp() + 60,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }
}
