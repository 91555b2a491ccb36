//! Repository for the `model_jobs` table.
//!
//! Pipeline transitions (`record_task`, `transition`) guard against
//! concurrent writers with a compare-and-swap on `updated_at`: the
//! caller passes the `updated_at` it last read, and the update only
//! lands if no other writer got there first. A `None` return means the
//! row changed underneath us (or is gone) and the caller should
//! re-read.

use sqlx::PgPool;

use mesa_core::status::ModelJobStatus;
use mesa_core::types::{DbId, Timestamp};

use crate::models::model_job::{CreateModelJob, ModelJob, ModelJobListQuery, UpdateModelJob};

/// Column list for `model_jobs` queries.
const COLUMNS: &str = "\
    id, restaurant_id, item_id, source_type, provider, ai_model, \
    auto_mode, status, notes, model_glb, model_usdz, reference_images, \
    provider_task_id, provider_task_endpoint, provider_status, \
    created_by, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD and transition operations for model-generation jobs.
pub struct ModelJobRepo;

impl ModelJobRepo {
    /// Insert a new job in `enviado` status.
    ///
    /// Field-level validation (enums, notes cap) happens in the
    /// handler; this only persists.
    pub async fn create(
        pool: &PgPool,
        restaurant_id: DbId,
        created_by: DbId,
        input: &CreateModelJob,
    ) -> Result<ModelJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO model_jobs \
                 (restaurant_id, item_id, source_type, provider, ai_model, \
                  auto_mode, notes, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(restaurant_id)
            .bind(input.item_id)
            .bind(&input.source_type)
            .bind(input.provider.as_deref().unwrap_or("meshy"))
            .bind(input.ai_model.as_deref().unwrap_or(""))
            .bind(input.auto_mode.unwrap_or(false))
            .bind(input.notes.as_deref().unwrap_or(""))
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ModelJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM model_jobs WHERE id = $1");
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a restaurant's jobs, newest first, with optional status
    /// filter and pagination.
    pub async fn list_by_restaurant(
        pool: &PgPool,
        restaurant_id: DbId,
        params: &ModelJobListQuery,
    ) -> Result<Vec<ModelJob>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM model_jobs \
             WHERE restaurant_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(restaurant_id)
            .bind(params.status.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Apply a direct edit. `None` fields are left untouched.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateModelJob,
    ) -> Result<Option<ModelJob>, sqlx::Error> {
        let query = format!(
            "UPDATE model_jobs SET \
                 status      = COALESCE($2, status), \
                 provider    = COALESCE($3, provider), \
                 ai_model    = COALESCE($4, ai_model), \
                 auto_mode   = COALESCE($5, auto_mode), \
                 notes       = COALESCE($6, notes), \
                 model_glb   = COALESCE($7, model_glb), \
                 model_usdz  = COALESCE($8, model_usdz), \
                 updated_at  = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(id)
            .bind(input.status.as_deref())
            .bind(input.provider.as_deref())
            .bind(input.ai_model.as_deref())
            .bind(input.auto_mode)
            .bind(input.notes.as_deref())
            .bind(input.model_glb.as_deref())
            .bind(input.model_usdz.as_deref())
            .fetch_optional(pool)
            .await
    }

    /// Append uploaded reference-image paths to the job's ordered list.
    pub async fn append_reference_images(
        pool: &PgPool,
        id: DbId,
        paths: &[String],
    ) -> Result<Option<ModelJob>, sqlx::Error> {
        let query = format!(
            "UPDATE model_jobs \
             SET reference_images = reference_images || $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(id)
            .bind(paths)
            .fetch_optional(pool)
            .await
    }

    /// Record a freshly submitted provider task and move the job to
    /// `processando`. A new start overwrites any previous task handle.
    ///
    /// Compare-and-swap on `updated_at`; returns `None` on a lost race.
    pub async fn record_task(
        pool: &PgPool,
        id: DbId,
        expected_updated_at: Timestamp,
        task_id: &str,
        endpoint: &str,
        raw_status: Option<&str>,
    ) -> Result<Option<ModelJob>, sqlx::Error> {
        let query = format!(
            "UPDATE model_jobs SET \
                 status = $3, \
                 provider_task_id = $4, \
                 provider_task_endpoint = $5, \
                 provider_status = $6, \
                 updated_at = NOW() \
             WHERE id = $1 AND updated_at = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(id)
            .bind(expected_updated_at)
            .bind(ModelJobStatus::Processando.as_str())
            .bind(task_id)
            .bind(endpoint)
            .bind(raw_status)
            .fetch_optional(pool)
            .await
    }

    /// Move a job to `status`, updating the raw provider status and
    /// (only where currently empty) the artifact paths.
    ///
    /// Compare-and-swap on `updated_at`; returns `None` on a lost race.
    /// `COALESCE(model_glb, $n)` keeps materialization non-destructive:
    /// a manually set or previously fetched path is never overwritten.
    #[allow(clippy::too_many_arguments)]
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        expected_updated_at: Timestamp,
        status: ModelJobStatus,
        provider_status: Option<&str>,
        model_glb: Option<&str>,
        model_usdz: Option<&str>,
    ) -> Result<Option<ModelJob>, sqlx::Error> {
        let query = format!(
            "UPDATE model_jobs SET \
                 status = $3, \
                 provider_status = COALESCE($4, provider_status), \
                 model_glb = COALESCE(model_glb, $5), \
                 model_usdz = COALESCE(model_usdz, $6), \
                 updated_at = NOW() \
             WHERE id = $1 AND updated_at = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(id)
            .bind(expected_updated_at)
            .bind(status.as_str())
            .bind(provider_status)
            .bind(model_glb)
            .bind(model_usdz)
            .fetch_optional(pool)
            .await
    }

    /// Persist a terminal failure unconditionally.
    ///
    /// No compare-and-swap here: a start/sync failure must never be
    /// silently dropped, even if the row was touched concurrently.
    pub async fn set_error(
        pool: &PgPool,
        id: DbId,
        provider_status: &str,
    ) -> Result<Option<ModelJob>, sqlx::Error> {
        let query = format!(
            "UPDATE model_jobs \
             SET status = $2, provider_status = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(id)
            .bind(ModelJobStatus::Erro.as_str())
            .bind(provider_status)
            .fetch_optional(pool)
            .await
    }

    /// Refresh only the diagnostic provider status (non-terminal poll).
    pub async fn set_provider_status(
        pool: &PgPool,
        id: DbId,
        provider_status: &str,
    ) -> Result<Option<ModelJob>, sqlx::Error> {
        let query = format!(
            "UPDATE model_jobs \
             SET provider_status = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelJob>(&query)
            .bind(id)
            .bind(provider_status)
            .fetch_optional(pool)
            .await
    }

    /// IDs of every job attached to an item (used to purge blob
    /// prefixes before a cascading item delete).
    pub async fn list_ids_by_item(pool: &PgPool, item_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as("SELECT id FROM model_jobs WHERE item_id = $1")
            .bind(item_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Delete a job row. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM model_jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
