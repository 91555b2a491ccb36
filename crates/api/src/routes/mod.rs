pub mod auth;
pub mod health;
pub mod items;
pub mod model_jobs;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                 login (public)
/// /auth/logout                                logout
///
/// /items/{id}                                 get, delete
///
/// /restaurants/{restaurant_id}/model-jobs     list, create
/// /model-jobs/{id}                            get, update, delete
/// /model-jobs/{id}/images                     upload reference images
/// /model-jobs/{id}/ai/start                   submit provider task
/// /model-jobs/{id}/ai/sync                    poll provider task
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .merge(items::router())
        .merge(model_jobs::router(
            config.upload_max_files,
            config.upload_max_bytes,
        ))
}
