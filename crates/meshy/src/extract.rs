//! Defensive extraction of identifiers and URLs from vendor payloads.
//!
//! The vendor's response shape varies by endpoint and API version, so
//! each extractor walks an explicit ordered table of key paths and
//! takes the first hit. The tables are the contract; keep them visible
//! rather than folding them into clever traversal code.

use serde_json::Value;

use mesa_core::assets::is_absolute_http_url;

/// Key paths that may hold the task ID, in probe order.
const TASK_ID_PATHS: &[&[&str]] = &[
    &["result"],
    &["id"],
    &["task_id"],
    &["task", "id"],
    &["data", "id"],
    &["result", "id"],
];

/// Key paths that may hold the task status, in probe order.
const STATUS_PATHS: &[&[&str]] = &[
    &["status"],
    &["data", "status"],
    &["result", "status"],
    &["task", "status"],
];

/// Containers that may wrap the result-URL map, in probe order. The
/// empty path is the payload root.
const URL_CONTAINERS: &[&[&str]] = &[&[], &["result"], &["output"], &["data"]];

/// Result URLs for the two output formats.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ModelUrls {
    pub glb: Option<String>,
    pub usdz: Option<String>,
}

/// Walk a key path into a JSON value.
fn value_at<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = payload;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Non-empty string at a key path.
fn string_at(payload: &Value, path: &[&str]) -> Option<String> {
    match value_at(payload, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Extract the provider task ID from a submission response.
pub fn extract_task_id(payload: &Value) -> Option<String> {
    TASK_ID_PATHS
        .iter()
        .find_map(|path| string_at(payload, path))
}

/// Extract the raw task status from a polling response.
pub fn extract_status(payload: &Value) -> Option<String> {
    STATUS_PATHS
        .iter()
        .find_map(|path| string_at(payload, path))
}

/// Extract the output-format URLs from a polling response.
///
/// For each container, tries the `model_urls`/`modelUrls` map first,
/// then flat `<fmt>_url`/`<fmt>Url`/`<fmt>` keys. Only well-formed
/// absolute HTTP(S) URLs are accepted; anything else is skipped as if
/// absent.
pub fn extract_model_urls(payload: &Value) -> ModelUrls {
    ModelUrls {
        glb: extract_format_url(payload, "glb"),
        usdz: extract_format_url(payload, "usdz"),
    }
}

fn extract_format_url(payload: &Value, format: &str) -> Option<String> {
    let flat_keys = [
        format!("{format}_url"),
        format!("{format}Url"),
        format.to_string(),
    ];

    for container_path in URL_CONTAINERS {
        let Some(container) = value_at(payload, container_path) else {
            continue;
        };
        for map_key in ["model_urls", "modelUrls"] {
            if let Some(url) = string_at(container, &[map_key, format]) {
                if is_absolute_http_url(&url) {
                    return Some(url);
                }
            }
        }
        for key in &flat_keys {
            // The bare format key only counts inside a wrapping
            // container; a root-level "glb" would be too ambiguous.
            if key == format && container_path.is_empty() {
                continue;
            }
            if let Some(url) = string_at(container, &[key.as_str()]) {
                if is_absolute_http_url(&url) {
                    return Some(url);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_id_top_level_result_string() {
        let payload = json!({ "result": "task-123" });
        assert_eq!(extract_task_id(&payload).as_deref(), Some("task-123"));
    }

    #[test]
    fn task_id_probes_nested_shapes_in_order() {
        assert_eq!(
            extract_task_id(&json!({ "id": "a" })).as_deref(),
            Some("a")
        );
        assert_eq!(
            extract_task_id(&json!({ "task_id": "b" })).as_deref(),
            Some("b")
        );
        assert_eq!(
            extract_task_id(&json!({ "task": { "id": "c" } })).as_deref(),
            Some("c")
        );
        assert_eq!(
            extract_task_id(&json!({ "data": { "id": "d" } })).as_deref(),
            Some("d")
        );
        assert_eq!(
            extract_task_id(&json!({ "result": { "id": "e" } })).as_deref(),
            Some("e")
        );
    }

    #[test]
    fn task_id_prefers_earlier_paths() {
        let payload = json!({ "result": "first", "id": "second" });
        assert_eq!(extract_task_id(&payload).as_deref(), Some("first"));
    }

    #[test]
    fn task_id_missing_or_wrong_type() {
        assert_eq!(extract_task_id(&json!({})), None);
        assert_eq!(extract_task_id(&json!({ "id": 42 })), None);
        assert_eq!(extract_task_id(&json!({ "result": "" })), None);
    }

    #[test]
    fn status_probes_shapes() {
        assert_eq!(
            extract_status(&json!({ "status": "PENDING" })).as_deref(),
            Some("PENDING")
        );
        assert_eq!(
            extract_status(&json!({ "data": { "status": "SUCCEEDED" } })).as_deref(),
            Some("SUCCEEDED")
        );
        assert_eq!(extract_status(&json!({})), None);
    }

    #[test]
    fn model_urls_under_model_urls_map() {
        let payload = json!({
            "model_urls": {
                "glb": "https://assets.example.com/m.glb",
                "usdz": "https://assets.example.com/m.usdz"
            }
        });
        let urls = extract_model_urls(&payload);
        assert_eq!(urls.glb.as_deref(), Some("https://assets.example.com/m.glb"));
        assert_eq!(urls.usdz.as_deref(), Some("https://assets.example.com/m.usdz"));
    }

    #[test]
    fn model_urls_nested_and_camel_case() {
        let payload = json!({
            "result": { "modelUrls": { "glb": "https://cdn.example.com/a.glb" } },
            "data": { "usdz_url": "https://cdn.example.com/a.usdz" }
        });
        let urls = extract_model_urls(&payload);
        assert_eq!(urls.glb.as_deref(), Some("https://cdn.example.com/a.glb"));
        assert_eq!(urls.usdz.as_deref(), Some("https://cdn.example.com/a.usdz"));
    }

    #[test]
    fn model_urls_reject_non_absolute_urls() {
        let payload = json!({
            "model_urls": { "glb": "outputs/m.glb" },
            "output": { "usdz": "ftp://host/m.usdz" }
        });
        let urls = extract_model_urls(&payload);
        assert_eq!(urls, ModelUrls::default());
    }

    #[test]
    fn model_urls_bare_format_key_requires_container() {
        let payload = json!({ "glb": "https://cdn.example.com/root.glb" });
        assert_eq!(extract_model_urls(&payload).glb, None);

        let payload = json!({ "output": { "glb": "https://cdn.example.com/out.glb" } });
        assert_eq!(
            extract_model_urls(&payload).glb.as_deref(),
            Some("https://cdn.example.com/out.glb")
        );
    }
}
