//! Session-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use mesa_core::error::CoreError;
use mesa_core::types::DbId;
use mesa_db::repositories::{SessionRepo, UserRepo};

use crate::auth::token::hash_token;
use crate::error::AppError;
use crate::state::AppState;

/// Role name granting cross-tenant access.
pub const ROLE_ADMIN: &str = "admin";

/// Authenticated user resolved from an opaque Bearer token in the
/// `Authorization` header.
///
/// The token is hashed and looked up in the persisted `sessions`
/// table; expired sessions are rejected here and reaped by the
/// background sweep.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// Tenant scope; `None` for platform admins.
    pub restaurant_id: Option<DbId>,
    pub role: String,
}

impl AuthUser {
    /// Whether this caller may operate on a restaurant's resources.
    pub fn can_access(&self, restaurant_id: DbId) -> bool {
        self.role == ROLE_ADMIN || self.restaurant_id == Some(restaurant_id)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing or malformed Authorization header".into(),
            ))
        })?;

        let session = SessionRepo::find_by_token_hash(&state.pool, &hash_token(token))
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
            })?;

        let user = UserRepo::find_by_id(&state.pool, session.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Session user no longer exists".into()))
            })?;

        Ok(AuthUser {
            user_id: user.id,
            restaurant_id: user.restaurant_id,
            role: user.role,
        })
    }
}

/// Extract the raw Bearer token from request headers.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}
