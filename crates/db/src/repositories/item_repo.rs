//! Repository for the `items` table.

use sqlx::PgPool;

use mesa_core::types::DbId;

use crate::models::item::Item;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, restaurant_id, name, image_url, scan_captures, \
    model_glb, model_usdz, created_at, updated_at";

/// Provides lookup and model-field updates for menu items.
pub struct ItemRepo;

impl ItemRepo {
    /// Find an item by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Item>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM items WHERE id = $1");
        sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Publish cascade: overwrite the item's model fields from a job.
    ///
    /// `None` arguments leave the item's existing value untouched, so
    /// a job with only a GLB never blanks an item's USDZ.
    pub async fn update_model_fields(
        pool: &PgPool,
        id: DbId,
        model_glb: Option<&str>,
        model_usdz: Option<&str>,
    ) -> Result<Option<Item>, sqlx::Error> {
        let query = format!(
            "UPDATE items SET \
                 model_glb = COALESCE($2, model_glb), \
                 model_usdz = COALESCE($3, model_usdz), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .bind(model_glb)
            .bind(model_usdz)
            .fetch_optional(pool)
            .await
    }

    /// Delete an item. `model_jobs` rows cascade at the database
    /// level; the caller purges their stored blobs first.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
