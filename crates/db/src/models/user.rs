//! User entity for authentication.

use serde::Serialize;
use sqlx::FromRow;

use mesa_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DbId,
    /// `None` for platform admins, who are not scoped to a tenant.
    pub restaurant_id: Option<DbId>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
