//! Job State Machine: owns the lifecycle transitions driven by the
//! `start` and `sync` operations.
//!
//! ```text
//! enviado --start--> processando --sync--> revisao --sync/edit--> publicado
//!                        \--sync/start failure--> erro
//! ```
//!
//! Failures are recorded, not swallowed: any adapter failure after
//! validation persists `erro` plus a diagnostic marker so a job is
//! never left silently stuck in `processando`.

use std::sync::Arc;

use sqlx::PgPool;

use mesa_core::error::CoreError;
use mesa_core::job::Provider;
use mesa_core::status::ModelJobStatus;
use mesa_core::storage::BlobStore;
use mesa_db::models::model_job::{ModelJob, UpdateModelJob};
use mesa_db::repositories::{ItemRepo, ModelJobRepo};
use mesa_meshy::{Endpoint, MeshyClient, MeshyError, SubmitOptions, TaskOutcome};

use crate::materializer::{self, ModelFormat};
use crate::resolver;

/// Diagnostic `provider_status` marker for a failed submission.
pub const ERROR_ON_START: &str = "ERROR_ON_START";

/// Diagnostic `provider_status` marker for a failed poll.
pub const ERROR_ON_SYNC: &str = "ERROR_ON_SYNC";

/// Errors from the pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The job's provider has no adapter (e.g. `manual`).
    #[error("Provider '{0}' has no automated pipeline")]
    ProviderNotImplemented(String),

    /// `sync` was called before any task was recorded.
    #[error("No provider task recorded for this job")]
    ProviderTaskMissing,

    /// The job row changed under us (compare-and-swap lost).
    #[error("Job was modified concurrently; re-read and retry")]
    ConcurrentUpdate,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Provider(#[from] MeshyError),
}

/// Caller options for `start`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    /// Provider override, applied before submission.
    pub provider: Option<String>,
    /// Vendor model override for this start only.
    pub ai_model: Option<String>,
    pub target_polycount: Option<u32>,
}

/// Caller options for `sync`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    /// Opt in to auto-advancing to `publicado`; only honored when the
    /// job itself has `auto_mode` set.
    #[serde(default)]
    pub auto_publish: bool,
}

/// Result of a successful `start`.
#[derive(Debug)]
pub struct StartOutput {
    pub job: ModelJob,
    pub task_id: String,
    pub endpoint_used: String,
    pub images_sent: usize,
}

/// Result of a successful `sync`.
#[derive(Debug)]
pub struct SyncOutput {
    pub job: ModelJob,
    /// Raw provider status string for the caller's diagnostics.
    pub provider_status: String,
}

/// The generation pipeline with its external collaborators.
pub struct Pipeline {
    storage: Arc<dyn BlobStore>,
    meshy: Arc<MeshyClient>,
    http: reqwest::Client,
    max_reference_images: usize,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn BlobStore>,
        meshy: Arc<MeshyClient>,
        http: reqwest::Client,
        max_reference_images: usize,
    ) -> Self {
        Self {
            storage,
            meshy,
            http,
            max_reference_images,
        }
    }

    /// Submit a generation task for a job: `enviado -> processando`.
    ///
    /// Restarting is allowed from any state; a new start overwrites
    /// the previous task handle. Validation failures (unimplemented
    /// provider, unconfigured credential, no resolvable image) leave
    /// the job untouched; an upstream failure persists `erro` with
    /// [`ERROR_ON_START`] before propagating.
    pub async fn start(
        &self,
        pool: &PgPool,
        mut job: ModelJob,
        options: &StartOptions,
    ) -> Result<StartOutput, PipelineError> {
        // All input-class checks run before the job row is touched:
        // a rejected start leaves no trace.
        validate_start_provider(&job, options.provider.as_deref())?;

        if let Some(provider) = options.provider.as_deref() {
            if provider != job.provider {
                job = ModelJobRepo::update(
                    pool,
                    job.id,
                    &UpdateModelJob {
                        provider: Some(provider.to_string()),
                        ..Default::default()
                    },
                )
                .await?
                .ok_or(PipelineError::ConcurrentUpdate)?;
            }
        }

        let item = ItemRepo::find_by_id(pool, job.item_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Item",
                id: job.item_id,
            })?;

        let images = resolver::build_inputs(
            self.storage.as_ref(),
            &item,
            &job,
            self.max_reference_images,
        )
        .await;
        if images.is_empty() {
            return Err(MeshyError::NoImageInput.into());
        }

        let submit_options = SubmitOptions {
            ai_model: self
                .meshy
                .config()
                .resolve_model(options.ai_model.as_deref(), &job.ai_model),
            target_polycount: options.target_polycount,
        };

        let outcome = match self.meshy.submit(&images, &submit_options).await {
            Ok(outcome) => outcome,
            // Detected before any task exists: leave the job as-is.
            Err(e @ (MeshyError::Unconfigured | MeshyError::NoImageInput)) => {
                return Err(e.into())
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Model generation start failed");
                ModelJobRepo::set_error(pool, job.id, ERROR_ON_START).await?;
                return Err(e.into());
            }
        };

        let updated = ModelJobRepo::record_task(
            pool,
            job.id,
            job.updated_at,
            &outcome.task_id,
            outcome.endpoint.path(),
            None,
        )
        .await?
        .ok_or(PipelineError::ConcurrentUpdate)?;

        tracing::info!(
            job_id = %updated.id,
            task_id = %outcome.task_id,
            endpoint = outcome.endpoint.path(),
            images = images.len(),
            "Model generation task submitted",
        );

        Ok(StartOutput {
            job: updated,
            task_id: outcome.task_id,
            endpoint_used: outcome.endpoint.path().to_string(),
            images_sent: images.len(),
        })
    }

    /// Poll the provider task and advance the job accordingly.
    ///
    /// Idempotent for a given provider status: a repeated sync against
    /// an unchanged task only bumps `provider_status`/`updated_at`.
    /// A `publicado` job is never moved off its status here.
    pub async fn sync(
        &self,
        pool: &PgPool,
        job: ModelJob,
        options: &SyncOptions,
    ) -> Result<SyncOutput, PipelineError> {
        if Provider::from_name(&job.provider)? != Provider::Meshy || !job.has_task() {
            return Err(PipelineError::ProviderTaskMissing);
        }
        let task_id = job.provider_task_id.as_deref().unwrap_or_default();
        let hint = job
            .provider_task_endpoint
            .as_deref()
            .and_then(Endpoint::from_path);

        let fetched = match self.meshy.fetch(task_id, hint).await {
            Ok(fetched) => fetched,
            Err(e @ MeshyError::Unconfigured) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(job_id = %job.id, task_id, error = %e, "Model generation sync failed");
                ModelJobRepo::set_error(pool, job.id, ERROR_ON_SYNC).await?;
                return Err(e.into());
            }
        };

        let raw_status = fetched.raw_status.clone();
        let outcome = mesa_meshy::status::map_provider_status(&raw_status);
        match plan_sync(&job, outcome) {
            SyncPlan::RefreshOnly => {
                let updated = ModelJobRepo::set_provider_status(pool, job.id, &raw_status)
                    .await?
                    .ok_or(PipelineError::ConcurrentUpdate)?;
                Ok(SyncOutput {
                    job: updated,
                    provider_status: raw_status,
                })
            }
            SyncPlan::MarkFailed => {
                let updated = ModelJobRepo::transition(
                    pool,
                    job.id,
                    job.updated_at,
                    ModelJobStatus::Erro,
                    Some(&raw_status),
                    None,
                    None,
                )
                .await?
                .ok_or(PipelineError::ConcurrentUpdate)?;
                tracing::info!(job_id = %updated.id, status = %raw_status, "Provider reported task failure");
                Ok(SyncOutput {
                    job: updated,
                    provider_status: raw_status,
                })
            }
            SyncPlan::Complete => {
                self.complete(pool, job, &fetched.payload, raw_status, options)
                    .await
            }
        }
    }

    /// Terminal-success path: materialize artifacts, move to `revisao`
    /// and optionally auto-publish.
    async fn complete(
        &self,
        pool: &PgPool,
        job: ModelJob,
        payload: &serde_json::Value,
        raw_status: String,
        options: &SyncOptions,
    ) -> Result<SyncOutput, PipelineError> {
        let urls = mesa_meshy::extract::extract_model_urls(payload);
        let (glb_url, usdz_url) = artifacts_to_fetch(&job, urls.glb.as_deref(), urls.usdz.as_deref());

        // Each artifact is persisted independently: a failed USDZ
        // download never rolls back a fetched GLB, and the job still
        // reaches revisao.
        let glb_key = self.materialize(&job, glb_url, ModelFormat::Glb).await;
        let usdz_key = self.materialize(&job, usdz_url, ModelFormat::Usdz).await;

        let updated = match ModelJobRepo::transition(
            pool,
            job.id,
            job.updated_at,
            ModelJobStatus::Revisao,
            Some(&raw_status),
            glb_key.as_deref(),
            usdz_key.as_deref(),
        )
        .await?
        {
            Some(updated) => updated,
            // Lost the race after downloading: no row references the
            // fresh blobs, and nothing else ever would.
            None => {
                self.purge_orphans(&job, [glb_key.as_deref(), usdz_key.as_deref()])
                    .await;
                return Err(PipelineError::ConcurrentUpdate);
            }
        };

        let updated = if updated.auto_mode && options.auto_publish {
            let published = ModelJobRepo::transition(
                pool,
                updated.id,
                updated.updated_at,
                ModelJobStatus::Publicado,
                None,
                None,
                None,
            )
            .await?
            .ok_or(PipelineError::ConcurrentUpdate)?;
            apply_publish_cascade(pool, &published).await?;
            published
        } else {
            updated
        };

        tracing::info!(
            job_id = %updated.id,
            status = %updated.status,
            "Model generation task completed",
        );

        Ok(SyncOutput {
            job: updated,
            provider_status: raw_status,
        })
    }

    /// Delete materialized blobs that no job row ended up referencing.
    async fn purge_orphans(&self, job: &ModelJob, keys: [Option<&str>; 2]) {
        for key in keys.into_iter().flatten() {
            if let Err(e) = self.storage.delete_prefix(key).await {
                tracing::warn!(job_id = %job.id, key, error = %e, "Failed to remove orphaned artifact");
            }
        }
    }

    async fn materialize(
        &self,
        job: &ModelJob,
        url: Option<&str>,
        format: ModelFormat,
    ) -> Option<String> {
        let url = url?;
        match materializer::persist(&self.http, self.storage.as_ref(), url, format).await {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(
                    job_id = %job.id,
                    url,
                    format = format.extension(),
                    error = %e,
                    "Artifact download failed; leaving field empty",
                );
                None
            }
        }
    }
}

/// What a sync should do with the mapped provider outcome, given the
/// job's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPlan {
    /// Refresh `provider_status` only; the domain status stays put.
    RefreshOnly,
    MarkFailed,
    Complete,
}

/// Decide the sync action. A published job is terminal for the
/// pipeline: whatever the provider reports on a repeated poll, sync
/// never demotes it, only refreshes the diagnostic status.
fn plan_sync(job: &ModelJob, outcome: TaskOutcome) -> SyncPlan {
    if job.status == ModelJobStatus::Publicado.as_str() {
        return SyncPlan::RefreshOnly;
    }
    match outcome {
        TaskOutcome::InProgress => SyncPlan::RefreshOnly,
        TaskOutcome::Failed => SyncPlan::MarkFailed,
        TaskOutcome::Succeeded => SyncPlan::Complete,
    }
}

/// Input-class checks for `start`, resolved before any write.
///
/// A provider override must name a known provider, may only differ
/// from the job's once no task exists, and the effective provider must
/// have an automated pipeline. Any rejection here leaves the job row
/// exactly as it was.
fn validate_start_provider(job: &ModelJob, requested: Option<&str>) -> Result<(), PipelineError> {
    if let Some(requested) = requested {
        Provider::from_name(requested)?;
        if requested != job.provider && job.has_task() {
            return Err(CoreError::Validation(
                "Provider cannot be changed after a task was submitted".into(),
            )
            .into());
        }
    }
    match Provider::from_name(requested.unwrap_or(&job.provider))? {
        Provider::Meshy => Ok(()),
        other => Err(PipelineError::ProviderNotImplemented(
            other.as_str().to_string(),
        )),
    }
}

/// Which result URLs actually need fetching: only formats whose job
/// field is still empty. Materialization never clobbers a value a
/// human (or an earlier sync) already set.
pub fn artifacts_to_fetch<'a>(
    job: &ModelJob,
    glb_url: Option<&'a str>,
    usdz_url: Option<&'a str>,
) -> (Option<&'a str>, Option<&'a str>) {
    let wants_glb = job.model_glb.as_deref().unwrap_or("").is_empty();
    let wants_usdz = job.model_usdz.as_deref().unwrap_or("").is_empty();
    (
        if wants_glb { glb_url } else { None },
        if wants_usdz { usdz_url } else { None },
    )
}

/// Copy a published job's model fields onto its item.
///
/// Only non-empty job fields are cascaded; an empty job field leaves
/// the item's existing value untouched. Called on every transition
/// into `publicado`, automated or via direct edit.
pub async fn apply_publish_cascade(pool: &PgPool, job: &ModelJob) -> Result<(), PipelineError> {
    let (glb, usdz) = cascade_fields(job);
    if glb.is_none() && usdz.is_none() {
        return Ok(());
    }
    ItemRepo::update_model_fields(pool, job.item_id, glb, usdz).await?;
    tracing::info!(job_id = %job.id, item_id = %job.item_id, "Published model onto item");
    Ok(())
}

/// Non-empty model fields of a job, as cascade inputs.
fn cascade_fields(job: &ModelJob) -> (Option<&str>, Option<&str>) {
    (non_empty(&job.model_glb), non_empty(&job.model_usdz))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use uuid::Uuid;

    fn job(model_glb: Option<&str>, model_usdz: Option<&str>) -> ModelJob {
        ModelJob {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            source_type: "upload".to_string(),
            provider: "meshy".to_string(),
            ai_model: String::new(),
            auto_mode: false,
            status: "processando".to_string(),
            notes: String::new(),
            model_glb: model_glb.map(String::from),
            model_usdz: model_usdz.map(String::from),
            reference_images: vec![],
            provider_task_id: Some("task-1".to_string()),
            provider_task_endpoint: None,
            provider_status: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn artifacts_only_fetched_into_empty_fields() {
        let glb = Some("https://cdn.example.com/a.glb");
        let usdz = Some("https://cdn.example.com/a.usdz");

        assert_eq!(
            artifacts_to_fetch(&job(None, None), glb, usdz),
            (glb, usdz)
        );
        // A previously materialized or manually set GLB is preserved.
        assert_eq!(
            artifacts_to_fetch(&job(Some("models/old.glb"), None), glb, usdz),
            (None, usdz)
        );
        // Empty string counts as unset.
        assert_eq!(
            artifacts_to_fetch(&job(Some(""), Some("models/x.usdz")), glb, usdz),
            (glb, None)
        );
    }

    #[test]
    fn cascade_skips_empty_job_fields() {
        assert_eq!(
            cascade_fields(&job(Some("models/a.glb"), None)),
            (Some("models/a.glb"), None)
        );
        assert_eq!(cascade_fields(&job(Some(""), None)), (None, None));
        assert_eq!(cascade_fields(&job(None, None)), (None, None));
    }

    #[test]
    fn sync_plan_follows_outcome_for_running_jobs() {
        let job = job(None, None);
        assert_eq!(plan_sync(&job, TaskOutcome::InProgress), SyncPlan::RefreshOnly);
        assert_eq!(plan_sync(&job, TaskOutcome::Failed), SyncPlan::MarkFailed);
        assert_eq!(plan_sync(&job, TaskOutcome::Succeeded), SyncPlan::Complete);
    }

    #[test]
    fn sync_never_demotes_a_published_job() {
        let mut published = job(Some("models/a.glb"), None);
        published.status = "publicado".to_string();

        // A repeated poll of the finished task reports SUCCEEDED (or,
        // per provider whim, FAILED) again; the job must stay put.
        assert_eq!(
            plan_sync(&published, TaskOutcome::Succeeded),
            SyncPlan::RefreshOnly
        );
        assert_eq!(
            plan_sync(&published, TaskOutcome::Failed),
            SyncPlan::RefreshOnly
        );
        assert_eq!(
            plan_sync(&published, TaskOutcome::InProgress),
            SyncPlan::RefreshOnly
        );
    }

    #[test]
    fn start_rejects_unimplemented_provider_before_any_write() {
        let mut manual = job(None, None);
        manual.provider = "manual".to_string();
        manual.provider_task_id = None;
        assert!(matches!(
            validate_start_provider(&manual, None),
            Err(PipelineError::ProviderNotImplemented(p)) if p == "manual"
        ));

        // An override to manual is rejected the same way, even on a
        // fresh meshy job, so the row is never switched first.
        let mut fresh = job(None, None);
        fresh.provider_task_id = None;
        assert!(matches!(
            validate_start_provider(&fresh, Some("manual")),
            Err(PipelineError::ProviderNotImplemented(p)) if p == "manual"
        ));

        assert!(matches!(
            validate_start_provider(&fresh, Some("openai")),
            Err(PipelineError::Core(CoreError::Validation(_)))
        ));
    }

    #[test]
    fn start_rejects_provider_change_once_a_task_exists() {
        let mut manual = job(None, None);
        manual.provider = "manual".to_string();
        // provider_task_id is set by the fixture.
        assert!(matches!(
            validate_start_provider(&manual, Some("meshy")),
            Err(PipelineError::Core(CoreError::Validation(_)))
        ));

        // Restating the current provider is a no-op, not a change.
        let with_task = job(None, None);
        assert!(validate_start_provider(&with_task, Some("meshy")).is_ok());
        assert!(validate_start_provider(&with_task, None).is_ok());
    }
}
