//! Model-job entity and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use mesa_core::types::{DbId, Timestamp};

/// A row from the `model_jobs` table: one 3D-generation attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelJob {
    pub id: DbId,
    pub restaurant_id: DbId,
    pub item_id: DbId,
    /// `scanner`, `upload` or `api`. Immutable after creation.
    pub source_type: String,
    /// `meshy` or `manual`. Mutable until a task has been submitted.
    pub provider: String,
    /// Vendor model/version selector; empty means provider default.
    pub ai_model: String,
    pub auto_mode: bool,
    /// Domain status; always one of the six `ModelJobStatus` names.
    pub status: String,
    pub notes: String,
    pub model_glb: Option<String>,
    pub model_usdz: Option<String>,
    /// Ordered upload history, append-only.
    pub reference_images: Vec<String>,
    pub provider_task_id: Option<String>,
    /// Which provider endpoint created the task; biases polling order.
    pub provider_task_endpoint: Option<String>,
    /// Last raw provider status string (diagnostics only).
    pub provider_status: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ModelJob {
    /// Whether a provider task has ever been submitted for this job.
    pub fn has_task(&self) -> bool {
        self.provider_task_id
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }
}

/// DTO for `POST /restaurants/{id}/model-jobs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelJob {
    pub item_id: DbId,
    pub source_type: String,
    pub provider: Option<String>,
    pub ai_model: Option<String>,
    pub auto_mode: Option<bool>,
    pub notes: Option<String>,
}

/// DTO for direct edits via `PATCH /model-jobs/{id}`.
///
/// Direct edits may set any status enum member, bypassing the state
/// machine; this is how manual jobs are advanced.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModelJob {
    pub status: Option<String>,
    pub provider: Option<String>,
    pub ai_model: Option<String>,
    pub auto_mode: Option<bool>,
    pub notes: Option<String>,
    pub model_glb: Option<String>,
    pub model_usdz: Option<String>,
}

/// Query parameters for `GET /restaurants/{id}/model-jobs`.
#[derive(Debug, Deserialize)]
pub struct ModelJobListQuery {
    pub status: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
