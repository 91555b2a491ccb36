//! Asset Resolver: turn a job's heterogeneous image references into a
//! provider-consumable input list.
//!
//! Candidate order is deliberate: a job's own uploaded reference
//! photos are the most explicit signal of what to reconstruct, item
//! scan captures are a fallback capture, and the listing photo is a
//! last resort. Within each group, newest first.

use std::collections::HashSet;

use base64::Engine as _;

use mesa_core::assets;
use mesa_core::storage::BlobStore;
use mesa_db::models::item::Item;
use mesa_db::models::model_job::ModelJob;

/// Gather, resolve, deduplicate and cap the input images for a job.
///
/// Best-effort: candidates with disallowed extensions or unreadable
/// stored files are skipped silently. An empty result is a valid
/// outcome the caller must treat as "no image input".
pub async fn build_inputs(
    storage: &dyn BlobStore,
    item: &Item,
    job: &ModelJob,
    max_images: usize,
) -> Vec<String> {
    let candidates = job
        .reference_images
        .iter()
        .rev()
        .chain(item.scan_captures.iter().rev())
        .chain(item.image_url.iter());

    let mut seen: HashSet<String> = HashSet::new();
    let mut inputs = Vec::new();

    for candidate in candidates {
        if inputs.len() >= max_images {
            break;
        }
        let Some(resolved) = resolve_candidate(storage, candidate).await else {
            continue;
        };
        // Dedup on the resolved value: two candidate paths that encode
        // to the same payload are sent once.
        if seen.insert(resolved.clone()) {
            inputs.push(resolved);
        }
    }

    inputs
}

/// Resolve one candidate reference.
///
/// Absolute HTTP(S) URLs pass through unchanged, subject to the image
/// extension allow-list when the path carries an extension at all.
/// Stored references are embedded as base64 data payloads.
async fn resolve_candidate(storage: &dyn BlobStore, reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }

    if assets::is_absolute_http_url(reference) {
        if assets::extension_of(reference).is_some() && !assets::has_image_extension(reference) {
            return None;
        }
        return Some(reference.to_string());
    }

    let ext = assets::extension_of(reference)?;
    let mime = assets::mime_for_extension(&ext)?;

    match storage.read(reference).await {
        Ok(bytes) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            Some(format!("data:{mime};base64,{encoded}"))
        }
        Err(e) => {
            tracing::debug!(reference, error = %e, "Skipping unreadable stored reference");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use mesa_core::storage::LocalStorage;
    use uuid::Uuid;

    fn item(image_url: Option<&str>, scans: &[&str]) -> Item {
        Item {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: "Feijoada".to_string(),
            image_url: image_url.map(String::from),
            scan_captures: scans.iter().map(|s| s.to_string()).collect(),
            model_glb: None,
            model_usdz: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn job(refs: &[&str]) -> ModelJob {
        ModelJob {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            source_type: "upload".to_string(),
            provider: "meshy".to_string(),
            ai_model: String::new(),
            auto_mode: false,
            status: "enviado".to_string(),
            notes: String::new(),
            model_glb: None,
            model_usdz: None,
            reference_images: refs.iter().map(|s| s.to_string()).collect(),
            provider_task_id: None,
            provider_task_endpoint: None,
            provider_status: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn prefers_job_refs_then_scans_then_item_photo() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let item = item(
            Some("https://cdn.example.com/photo.png"),
            &[
                "https://cdn.example.com/scan1.png",
                "https://cdn.example.com/scan2.png",
            ],
        );
        let job = job(&[
            "https://cdn.example.com/ref1.png",
            "https://cdn.example.com/ref2.png",
        ]);

        let inputs = build_inputs(&storage, &item, &job, 4).await;

        // Newest-first within each group.
        assert_eq!(
            inputs,
            vec![
                "https://cdn.example.com/ref2.png",
                "https://cdn.example.com/ref1.png",
                "https://cdn.example.com/scan2.png",
                "https://cdn.example.com/scan1.png",
            ]
        );
    }

    #[tokio::test]
    async fn caps_at_max_images() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let item = item(
            Some("https://cdn.example.com/photo.png"),
            &[
                "https://cdn.example.com/scan1.png",
                "https://cdn.example.com/scan2.png",
            ],
        );
        let job = job(&[
            "https://cdn.example.com/ref1.png",
            "https://cdn.example.com/ref2.png",
        ]);

        let inputs = build_inputs(&storage, &item, &job, 4).await;
        assert_eq!(inputs.len(), 4);
        assert!(!inputs.contains(&"https://cdn.example.com/photo.png".to_string()));
    }

    #[tokio::test]
    async fn encodes_stored_references_and_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage
            .write("model-jobs/j1/refs/a.png", b"pngbytes")
            .await
            .unwrap();

        let item = item(None, &[]);
        let job = job(&["model-jobs/j1/refs/a.png", "model-jobs/j1/refs/missing.png"]);

        let inputs = build_inputs(&storage, &item, &job, 4).await;
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn skips_non_image_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.write("refs/notes.txt", b"hi").await.unwrap();

        let item = item(Some("https://cdn.example.com/menu.pdf"), &[]);
        let job = job(&["refs/notes.txt"]);

        let inputs = build_inputs(&storage, &item, &job, 4).await;
        assert!(inputs.is_empty());
    }

    #[tokio::test]
    async fn remote_url_without_extension_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let item = item(Some("https://cdn.example.com/images/4821"), &[]);
        let job = job(&[]);

        let inputs = build_inputs(&storage, &item, &job, 4).await;
        assert_eq!(inputs, vec!["https://cdn.example.com/images/4821"]);
    }

    #[tokio::test]
    async fn deduplicates_on_resolved_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let url = "https://cdn.example.com/dish.png";
        let item = item(Some(url), &[url]);
        let job = job(&[url]);

        let inputs = build_inputs(&storage, &item, &job, 4).await;
        assert_eq!(inputs, vec![url.to_string()]);
    }

    #[tokio::test]
    async fn empty_sources_yield_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let inputs = build_inputs(&storage, &item(None, &[]), &job(&[]), 4).await;
        assert!(inputs.is_empty());
    }
}
