//! Handlers for `/auth`: session issue and revocation.

use axum::extract::State;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use mesa_core::error::CoreError;
use mesa_core::types::Timestamp;
use mesa_db::models::user::User;
use mesa_db::repositories::{SessionRepo, UserRepo};

use crate::auth::password::verify_password;
use crate::auth::token::{generate_token, hash_token};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::bearer_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Opaque bearer token; shown to the client exactly once.
    pub token: String,
    pub expires_at: Timestamp,
    pub user: User,
}

/// POST /api/v1/auth/login
///
/// The same `unauthorized` response covers unknown emails and wrong
/// passwords.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid email or password".into()))
        })?;

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {e}")))?;
    if !valid {
        return Err(CoreError::Unauthorized("Invalid email or password".into()).into());
    }

    let token = generate_token();
    let expires_at = Utc::now() + chrono::Duration::hours(state.config.session_ttl_hours);
    SessionRepo::create(&state.pool, user.id, &hash_token(&token), expires_at).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user,
    }))
}

/// POST /api/v1/auth/logout
///
/// Deletes the session for the presented token. Returns 204 whether or
/// not the token matched a live session.
pub async fn logout(State(state): State<AppState>, parts: Parts) -> AppResult<StatusCode> {
    if let Some(token) = bearer_token(&parts) {
        SessionRepo::delete_by_token_hash(&state.pool, &hash_token(token)).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
