//! Handlers for the `/items` collaborator surface.
//!
//! Items are owned by the menu CRUD subsystem; the pipeline only needs
//! lookup plus the cascading delete that purges job blobs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use mesa_core::error::CoreError;
use mesa_core::types::DbId;
use mesa_db::models::item::Item;
use mesa_db::repositories::{ItemRepo, ModelJobRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::model_jobs::job_blob_prefix;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Fetch an item and verify the caller's tenant scope covers it.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    item_id: DbId,
    auth: &AuthUser,
) -> AppResult<Item> {
    let item = ItemRepo::find_by_id(pool, item_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Item",
            id: item_id,
        }))?;

    if !auth.can_access(item.restaurant_id) {
        return Err(CoreError::Forbidden("Item belongs to another restaurant".into()).into());
    }

    Ok(item)
}

/// GET /api/v1/items/{id}
pub async fn get_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<DbId>,
) -> AppResult<Json<Item>> {
    let item = find_and_authorize(&state.pool, item_id, &auth).await?;
    Ok(Json(item))
}

/// DELETE /api/v1/items/{id}
///
/// Deleting an item cascades to its model jobs at the database level;
/// each job's stored reference images are purged first so no orphaned
/// blobs remain.
pub async fn delete_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let item = find_and_authorize(&state.pool, item_id, &auth).await?;

    let job_ids = ModelJobRepo::list_ids_by_item(&state.pool, item.id).await?;
    for job_id in &job_ids {
        if let Err(e) = state.storage.delete_prefix(&job_blob_prefix(*job_id)).await {
            tracing::warn!(item_id = %item.id, job_id = %job_id, error = %e, "Failed to purge job blobs");
        }
    }

    ItemRepo::delete(&state.pool, item.id).await?;

    tracing::info!(item_id = %item.id, jobs = job_ids.len(), "Item deleted with job cascade");

    Ok(StatusCode::NO_CONTENT)
}
