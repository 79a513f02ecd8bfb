//! JWT authentication module.
//!
//! Handles password hashing, session token issuing and validation, and the
//! [`AuthUser`] extractor that gates every protected route.
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! AuthUser::from_request_parts ── missing/invalid ──► 401 UNAUTHORIZED
//!        │
//!        ▼
//! user.require("users.view") ──── not granted ─────► 403 FORBIDDEN
//!        │
//!        ▼
//!     handler
//! ```
//!
//! Permissions are resolved once at login and carried in the token; they
//! are not re-read per request.

use std::sync::{Arc, OnceLock};

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tally_core::access::SessionUser;
use tally_core::{authorize, PermissionSet};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub username: String,

    pub role_id: Option<String>,

    /// Resolved permission codes, or `["all"]` for Admin
    pub permissions: Vec<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    /// Issue a session token for a user with resolved permissions.
    pub fn issue(&self, user: &SessionUser) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + self.lifetime;

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role_id: user.role_id.clone(),
            permissions: user.permissions.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::storage("Failed to issue token", e))
    }

    /// Validate and decode a token. Signature and expiry only.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(token, &self.decoding, &Validation::default())
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                ApiError::unauthorized()
            })?;

        Ok(token_data.claims)
    }
}

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password for storage (argon2id, random salt).
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| ApiError::storage("Password hashing failed", e))?
}

fn hash_password_blocking(password: &str) -> Result<String, ApiError> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::storage("Password hashing failed", e))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// With no stored hash a throwaway hash is checked instead, so unknown
/// usernames cost the same as wrong passwords.
pub async fn verify_password(password: String, stored: Option<String>) -> bool {
    let result = tokio::task::spawn_blocking(move || match stored {
        Some(hash) => verify_password_blocking(&password, &hash),
        None => {
            if let Some(dummy) = dummy_hash() {
                verify_password_blocking(&password, dummy);
            }
            false
        }
    })
    .await;

    result.unwrap_or(false)
}

fn verify_password_blocking(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password_blocking("tally-dummy-password").ok())
        .as_deref()
}

// =============================================================================
// Extractor
// =============================================================================

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Bearer token from request headers, if any.
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role_id: Option<String>,
    pub permissions: PermissionSet,
}

impl AuthUser {
    /// Verifies `token` and builds the caller from its claims.
    pub fn from_token(state: &AppState, token: Option<&str>) -> Result<Self, ApiError> {
        let token = token.ok_or_else(ApiError::unauthorized)?;
        let claims = state.jwt.verify(token)?;

        Ok(AuthUser {
            permissions: PermissionSet::from_claims(&claims.permissions),
            id: claims.sub,
            username: claims.username,
            role_id: claims.role_id,
        })
    }

    /// Fails with 403 unless the caller holds `code` (or is Admin).
    pub fn require(&self, code: &str) -> Result<(), ApiError> {
        authorize(&self.permissions, code).map_err(|e| {
            tracing::warn!(user = %self.username, permission = code, "Permission denied");
            ApiError::from(e)
        })
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_token(state, bearer_from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(permissions: &[&str]) -> SessionUser {
        SessionUser {
            id: "user-1".to_string(),
            username: "sam".to_string(),
            full_name: None,
            role_id: Some("role-1".to_string()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 24);
        let token = manager.issue(&session(&["products.view"])).unwrap();

        let claims = manager.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "sam");
        assert_eq!(claims.role_id.as_deref(), Some("role-1"));
        assert_eq!(claims.permissions, vec!["products.view"]);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new("secret-a", 24)
            .issue(&session(&[]))
            .unwrap();
        let err = JwtManager::new("secret-b", 24).verify(&token).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Unauthorized);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret", -1);
        let token = manager.issue(&session(&[])).unwrap();
        assert!(manager.verify(&token).is_err());
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[tokio::test]
    async fn test_password_hashing() {
        let hash = hash_password("secret123".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret123".to_string(), Some(hash.clone())).await);
        assert!(!verify_password("wrong".to_string(), Some(hash)).await);
        assert!(!verify_password("secret123".to_string(), None).await);
    }

    #[test]
    fn test_require_admin_and_none() {
        let admin = AuthUser {
            id: "u".to_string(),
            username: "admin".to_string(),
            role_id: None,
            permissions: PermissionSet::All,
        };
        assert!(admin.require("system.restore").is_ok());

        let nobody = AuthUser {
            permissions: PermissionSet::none(),
            ..admin
        };
        assert!(nobody.require("products.view").is_err());
    }
}
