//! Artifact Materializer: copy provider-hosted model files into
//! durable storage.
//!
//! Stored keys are freshly generated opaque names, never derived from
//! the source URL, keeping the `models/` namespace flat and
//! collision-free.

use mesa_core::storage::{BlobStore, StorageError};
use uuid::Uuid;

/// Output format of a generated model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// Android / web viewer format.
    Glb,
    /// iOS AR Quick Look format.
    Usdz,
}

impl ModelFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Usdz => "usdz",
        }
    }
}

/// Errors from artifact materialization.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// The artifact fetch returned a non-success status.
    #[error("Artifact download failed with status {0}")]
    DownloadFailed(u16),

    /// The HTTP request itself failed.
    #[error("Artifact download failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the artifact to storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Generate a fresh storage key for a materialized artifact.
fn storage_key(format: ModelFormat) -> String {
    format!("models/{}.{}", Uuid::new_v4(), format.extension())
}

/// Download `remote_url` and persist it, returning the stored key.
///
/// Invoked per format, and only when the corresponding job field is
/// still empty; the caller enforces that fill-only-if-empty rule.
pub async fn persist(
    http: &reqwest::Client,
    storage: &dyn BlobStore,
    remote_url: &str,
    format: ModelFormat,
) -> Result<String, MaterializeError> {
    let response = http.get(remote_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MaterializeError::DownloadFailed(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    let key = storage_key(format);
    storage.write(&key, &bytes).await?;

    tracing::info!(
        key = %key,
        bytes = bytes.len(),
        format = format.extension(),
        "Materialized model artifact",
    );

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_flat_opaque_and_format_suffixed() {
        let key = storage_key(ModelFormat::Glb);
        assert!(key.starts_with("models/"));
        assert!(key.ends_with(".glb"));
        assert_eq!(key.matches('/').count(), 1);

        // Fresh name per call, never derived from any input.
        assert_ne!(storage_key(ModelFormat::Usdz), storage_key(ModelFormat::Usdz));
        assert!(storage_key(ModelFormat::Usdz).ends_with(".usdz"));
    }
}
