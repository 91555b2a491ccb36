//! Handlers for the model-job lifecycle: CRUD, reference-image
//! uploads, and the `ai/start` / `ai/sync` pipeline operations.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use mesa_core::assets::{extension_of, has_image_extension};
use mesa_core::error::CoreError;
use mesa_core::job::{validate_notes, Provider, SourceType};
use mesa_core::status::ModelJobStatus;
use mesa_core::types::DbId;
use mesa_db::models::model_job::{
    CreateModelJob, ModelJob, ModelJobListQuery, UpdateModelJob,
};
use mesa_db::repositories::{ItemRepo, ModelJobRepo};
use mesa_meshy::MeshyError;
use mesa_pipeline::machine::{
    apply_publish_cascade, PipelineError, StartOptions, SyncOptions,
};

use crate::error::{truncate_detail, AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Blob-store prefix holding everything a job owns (uploaded reference
/// images today; anything job-scoped later).
pub fn job_blob_prefix(job_id: DbId) -> String {
    format!("model-jobs/{job_id}")
}

/// Response for `POST /model-jobs/{id}/ai/start`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub job: ModelJob,
    pub task_id: String,
    pub endpoint_used: String,
    pub images_sent: usize,
}

/// Response for `POST /model-jobs/{id}/ai/sync`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub job: ModelJob,
    pub provider_status: String,
}

/// Fetch a job and verify the caller's tenant scope covers it.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    job_id: DbId,
    auth: &AuthUser,
) -> AppResult<ModelJob> {
    let job = ModelJobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ModelJob",
            id: job_id,
        }))?;

    if !auth.can_access(job.restaurant_id) {
        return Err(CoreError::Forbidden("Job belongs to another restaurant".into()).into());
    }

    Ok(job)
}

/// POST /api/v1/restaurants/{restaurant_id}/model-jobs
pub async fn create_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(restaurant_id): Path<DbId>,
    Json(input): Json<CreateModelJob>,
) -> AppResult<(StatusCode, Json<ModelJob>)> {
    if !auth.can_access(restaurant_id) {
        return Err(CoreError::Forbidden("Not your restaurant".into()).into());
    }

    SourceType::from_name(&input.source_type)?;
    if let Some(provider) = input.provider.as_deref() {
        Provider::from_name(provider)?;
    }
    if let Some(notes) = input.notes.as_deref() {
        validate_notes(notes)?;
    }

    let item = ItemRepo::find_by_id(&state.pool, input.item_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Item",
            id: input.item_id,
        }))?;
    if item.restaurant_id != restaurant_id {
        return Err(
            CoreError::Validation("Item does not belong to this restaurant".into()).into(),
        );
    }

    let job = ModelJobRepo::create(&state.pool, restaurant_id, auth.user_id, &input).await?;

    tracing::info!(job_id = %job.id, item_id = %item.id, "Model job created");

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/restaurants/{restaurant_id}/model-jobs
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(restaurant_id): Path<DbId>,
    Query(params): Query<ModelJobListQuery>,
) -> AppResult<Json<Vec<ModelJob>>> {
    if !auth.can_access(restaurant_id) {
        return Err(CoreError::Forbidden("Not your restaurant".into()).into());
    }
    if let Some(status) = params.status.as_deref() {
        ModelJobStatus::from_name(status)?;
    }

    let jobs = ModelJobRepo::list_by_restaurant(&state.pool, restaurant_id, &params).await?;
    Ok(Json(jobs))
}

/// GET /api/v1/model-jobs/{id}
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<ModelJob>> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;
    Ok(Json(job))
}

/// PATCH /api/v1/model-jobs/{id}
///
/// Direct edits may set any status, bypassing the state machine; a
/// direct move into `publicado` still runs the item cascade.
pub async fn update_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<UpdateModelJob>,
) -> AppResult<Json<ModelJob>> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;

    if let Some(status) = input.status.as_deref() {
        ModelJobStatus::from_name(status)?;
    }
    if let Some(provider) = input.provider.as_deref() {
        Provider::from_name(provider)?;
        if provider != job.provider && job.has_task() {
            return Err(CoreError::Validation(
                "Provider cannot be changed after a task was submitted".into(),
            )
            .into());
        }
    }
    if let Some(notes) = input.notes.as_deref() {
        validate_notes(notes)?;
    }

    let updated = ModelJobRepo::update(&state.pool, job.id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ModelJob",
            id: job.id,
        }))?;

    let entered_publicado = updated.status == ModelJobStatus::Publicado.as_str()
        && job.status != ModelJobStatus::Publicado.as_str();
    if entered_publicado {
        apply_publish_cascade(&state.pool, &updated)
            .await
            .map_err(|e| map_pipeline_error(e, "publish_cascade_failed"))?;
    }

    Ok(Json(updated))
}

/// DELETE /api/v1/model-jobs/{id}
pub async fn delete_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;

    if let Err(e) = state.storage.delete_prefix(&job_blob_prefix(job.id)).await {
        tracing::warn!(job_id = %job.id, error = %e, "Failed to purge job blobs");
    }
    ModelJobRepo::delete(&state.pool, job.id).await?;

    tracing::info!(job_id = %job.id, "Model job deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/model-jobs/{id}/ai/start
pub async fn start_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(options): Json<StartOptions>,
) -> AppResult<Json<StartResponse>> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;

    let output = state
        .pipeline
        .start(&state.pool, job, &options)
        .await
        .map_err(|e| map_pipeline_error(e, "ai_start_failed"))?;

    Ok(Json(StartResponse {
        job: output.job,
        task_id: output.task_id,
        endpoint_used: output.endpoint_used,
        images_sent: output.images_sent,
    }))
}

/// POST /api/v1/model-jobs/{id}/ai/sync
pub async fn sync_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(options): Json<SyncOptions>,
) -> AppResult<Json<SyncResponse>> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;

    let output = state
        .pipeline
        .sync(&state.pool, job, &options)
        .await
        .map_err(|e| map_pipeline_error(e, "ai_sync_failed"))?;

    Ok(Json(SyncResponse {
        job: output.job,
        provider_status: output.provider_status,
    }))
}

/// POST /api/v1/model-jobs/{id}/images
///
/// Multipart upload of reference images. The whole call is atomic from
/// the client's point of view: any bad file fails the request before
/// the job row is touched.
pub async fn upload_images(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<Json<ModelJob>> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;

    let mut staged: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| invalid_upload(e.to_string()))? {
        if field.name() != Some("files") {
            continue;
        }
        if staged.len() >= state.config.upload_max_files {
            return Err(invalid_upload(format!(
                "Too many files; at most {} per upload",
                state.config.upload_max_files
            )));
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| invalid_upload("File part is missing a filename".into()))?;
        if !has_image_extension(&file_name) {
            return Err(invalid_upload(format!(
                "Unsupported file type: {file_name}"
            )));
        }
        // Allow-listed above, so the extension is present.
        let ext = extension_of(&file_name).unwrap_or_default();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| invalid_upload(e.to_string()))?;
        if bytes.is_empty() {
            return Err(invalid_upload(format!("File is empty: {file_name}")));
        }
        if bytes.len() > state.config.upload_max_bytes {
            return Err(invalid_upload(format!(
                "File exceeds {} bytes: {file_name}",
                state.config.upload_max_bytes
            )));
        }

        let key = format!("{}/refs/{}.{ext}", job_blob_prefix(job.id), DbId::new_v4());
        staged.push((key, bytes.to_vec()));
    }

    if staged.is_empty() {
        return Err(invalid_upload("No files in upload".into()));
    }

    let mut keys = Vec::with_capacity(staged.len());
    for (key, bytes) in &staged {
        state
            .storage
            .write(key, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {e}")))?;
        keys.push(key.clone());
    }

    let updated = ModelJobRepo::append_reference_images(&state.pool, job.id, &keys)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ModelJob",
            id: job.id,
        }))?;

    tracing::info!(job_id = %updated.id, files = keys.len(), "Reference images uploaded");

    Ok(Json(updated))
}

fn invalid_upload(message: String) -> AppError {
    AppError::BadRequest {
        code: "invalid_upload",
        message,
    }
}

/// Map pipeline failures onto HTTP codes.
///
/// Pre-submission validation failures come back as 400s with specific
/// codes; genuine upstream failures become 502s carrying `op_code`
/// (`ai_start_failed` / `ai_sync_failed`) and a truncated detail.
fn map_pipeline_error(err: PipelineError, op_code: &'static str) -> AppError {
    match err {
        PipelineError::ProviderNotImplemented(provider) => AppError::BadRequest {
            code: "provider_not_implemented",
            message: format!("Provider '{provider}' has no automated pipeline"),
        },
        PipelineError::ProviderTaskMissing => AppError::BadRequest {
            code: "provider_task_missing",
            message: "No provider task recorded for this job".into(),
        },
        PipelineError::ConcurrentUpdate => AppError::Core(CoreError::Conflict(
            "Job was modified concurrently; re-read and retry".into(),
        )),
        PipelineError::Core(e) => AppError::Core(e),
        PipelineError::Db(e) => AppError::Database(e),
        PipelineError::Provider(MeshyError::Unconfigured) => AppError::BadRequest {
            code: "provider_unconfigured",
            message: "Meshy provider is not configured (missing API key)".into(),
        },
        PipelineError::Provider(MeshyError::NoImageInput) => AppError::BadRequest {
            code: "image_source_not_found",
            message: "No reference image, scan capture or photo to submit".into(),
        },
        PipelineError::Provider(e) => AppError::Upstream {
            code: op_code,
            detail: truncate_detail(&e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_prefix_is_job_scoped() {
        let id = DbId::new_v4();
        assert_eq!(job_blob_prefix(id), format!("model-jobs/{id}"));
    }

    #[test]
    fn pipeline_validation_failures_map_to_bad_request() {
        let err = map_pipeline_error(
            PipelineError::Provider(MeshyError::NoImageInput),
            "ai_start_failed",
        );
        assert!(matches!(
            err,
            AppError::BadRequest {
                code: "image_source_not_found",
                ..
            }
        ));

        let err = map_pipeline_error(
            PipelineError::ProviderNotImplemented("manual".into()),
            "ai_start_failed",
        );
        assert!(matches!(
            err,
            AppError::BadRequest {
                code: "provider_not_implemented",
                ..
            }
        ));
    }

    #[test]
    fn upstream_failures_carry_operation_code() {
        let err = map_pipeline_error(
            PipelineError::Provider(MeshyError::RequestFailed {
                status: 500,
                body: "boom".into(),
            }),
            "ai_sync_failed",
        );
        assert!(matches!(
            err,
            AppError::Upstream {
                code: "ai_sync_failed",
                ..
            }
        ));
    }
}
