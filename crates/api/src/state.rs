use std::sync::Arc;

use mesa_core::storage::BlobStore;
use mesa_pipeline::machine::Pipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: mesa_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Blob store for reference images and materialized models.
    pub storage: Arc<dyn BlobStore>,
    /// The model-generation pipeline (state machine + collaborators).
    pub pipeline: Arc<Pipeline>,
}
