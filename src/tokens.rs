use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use password_hash::rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, types::Role};

pub const TOKEN_TTL_DAYS: i64 = 7;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;
const RESET_TOKEN_BYTES: usize = 32;

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::unauthorized("Token expired"),
            TokenError::Invalid => AppError::unauthorized("Invalid token"),
        }
    }
}

pub fn issue_token(secret: &str, user_id: Uuid, role: Role) -> Result<String, AppError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::days(TOKEN_TTL_DAYS))
        .ok_or_else(|| AppError::internal("Failed to set expiration"))?;

    let claims = Claims {
        user_id,
        role: role.as_str().to_string(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AppError::internal)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

/// Random URL-safe reset token; only its hash is ever stored.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing";

    #[test]
    fn issued_token_carries_user_and_role() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, Role::Client).expect("token");
        let claims = decode_token(SECRET, &token).expect("claims");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, "client");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_DAYS * 24 * 3600);
    }

    #[test]
    fn claims_serialize_user_id_in_camel_case() {
        let claims = Claims {
            user_id: Uuid::nil(),
            role: "admin".into(),
            iat: 0,
            exp: 1,
        };
        let value = serde_json::to_value(&claims).expect("json");
        assert!(value.get("userId").is_some());
        assert!(value.get("user_id").is_none());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_token(SECRET, Uuid::new_v4(), Role::Admin).expect("token");
        assert_eq!(decode_token("other-secret", &token), Err(TokenError::Invalid));
        assert_eq!(decode_token(SECRET, "not.a.jwt"), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_token_is_distinguished() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: Uuid::new_v4(),
            role: "client".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("token");
        assert_eq!(decode_token(SECRET, &token), Err(TokenError::Expired));
    }

    #[test]
    fn reset_tokens_are_random_and_hashed() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), RESET_TOKEN_BYTES * 2);
        assert_ne!(a, b);
        let hash = hash_token(&a);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token(&a));
        assert_ne!(hash, a);
    }
}
