//! Route definitions for model-generation jobs.
//!
//! ```text
//! GET  /restaurants/{restaurant_id}/model-jobs    list_jobs
//! POST /restaurants/{restaurant_id}/model-jobs    create_job
//! GET    /model-jobs/{id}                         get_job
//! PATCH  /model-jobs/{id}                         update_job
//! DELETE /model-jobs/{id}                         delete_job
//! POST   /model-jobs/{id}/images                  upload_images
//! POST   /model-jobs/{id}/ai/start                start_job
//! POST   /model-jobs/{id}/ai/sync                 sync_job
//! ```

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::model_jobs;
use crate::state::AppState;

/// Slack added on top of the configured per-file and per-call limits
/// for multipart framing overhead.
const UPLOAD_BODY_SLACK: usize = 1024 * 1024;

pub fn router(upload_max_files: usize, upload_max_bytes: usize) -> Router<AppState> {
    // The upload route needs a body limit covering a full batch of
    // files; everything else keeps Axum's default.
    let upload_limit = upload_max_files
        .saturating_mul(upload_max_bytes)
        .saturating_add(UPLOAD_BODY_SLACK);

    Router::new()
        .route(
            "/restaurants/{restaurant_id}/model-jobs",
            get(model_jobs::list_jobs).post(model_jobs::create_job),
        )
        .route(
            "/model-jobs/{id}",
            get(model_jobs::get_job)
                .patch(model_jobs::update_job)
                .delete(model_jobs::delete_job),
        )
        .route(
            "/model-jobs/{id}/images",
            post(model_jobs::upload_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/model-jobs/{id}/ai/start", post(model_jobs::start_job))
        .route("/model-jobs/{id}/ai/sync", post(model_jobs::sync_job))
}
