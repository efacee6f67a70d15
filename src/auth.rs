//! Token authentication.
//!
//! Clients send `Authorization: Token <key>` (`Bearer <key>` is accepted too).
//! Keys are random UUIDs stored in `auth_tokens`; passwords are stored as
//! Argon2id PHC strings.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use model::entities::{auth_token, user};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait, Set};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schemas::AppState;

const AUTH_SCHEMES: [&str; 2] = ["Token ", "Bearer "];

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// The key from an `Authorization` header, if it uses a known scheme.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    AUTH_SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Create and store a new token for the user.
pub async fn issue_token<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<String, DbErr> {
    let key = Uuid::new_v4().simple().to_string();
    auth_token::ActiveModel {
        key: Set(key.clone()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().naive_utc()),
    }
    .insert(db)
    .await?;
    debug!("Issued token for user {}", user_id);
    Ok(key)
}

/// Delete a token. Unknown keys are ignored.
pub async fn revoke_token<C: ConnectionTrait>(db: &C, key: &str) -> Result<(), DbErr> {
    auth_token::Entity::delete_by_id(key.to_string()).exec(db).await?;
    Ok(())
}

/// The user owning `key`, if the key exists.
pub async fn user_for_token<C: ConnectionTrait>(
    db: &C,
    key: &str,
) -> Result<Option<user::Model>, DbErr> {
    let Some(token) = auth_token::Entity::find_by_id(key.to_string()).one(db).await? else {
        return Ok(None);
    };
    token.find_related(user::Entity).one(db).await
}

/// A request that must carry a valid token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: user::Model,
    pub token: String,
}

/// A request that may be anonymous. A token that is present but unknown is
/// still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

impl MaybeUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|user| user.id)
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, ApiError> {
    let Some(key) = token_from_headers(&parts.headers) else {
        trace!("No token on request");
        return Ok(None);
    };

    match user_for_token(&state.db, key).await? {
        Some(user) => Ok(Some(AuthUser {
            user,
            token: key.to_string(),
        })),
        None => {
            debug!("Rejected unknown token");
            Err(ApiError::Unauthorized)
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await?.ok_or(ApiError::Unauthorized)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(parts, state).await?.map(|auth| auth.user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-pass", "not a hash"));
    }

    #[test]
    fn test_token_schemes() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc123"));
        assert_eq!(token_from_headers(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token "));
        assert_eq!(token_from_headers(&headers), None);
    }
}
