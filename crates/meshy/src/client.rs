//! HTTP client for the Meshy generation endpoints.

use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::extract;

/// Configuration for the Meshy adapter, loaded from the environment by
/// the API crate.
#[derive(Debug, Clone)]
pub struct MeshyConfig {
    /// Base HTTP URL, e.g. `https://api.meshy.ai`.
    pub base_url: String,
    /// API credential. `None` means the provider is unconfigured and
    /// every submit/fetch fails fast with [`MeshyError::Unconfigured`].
    pub api_key: Option<String>,
    /// Vendor model used when neither the request nor the job names one.
    pub default_model: String,
}

impl MeshyConfig {
    /// Resolve the vendor model selector.
    ///
    /// Override order: explicit request value, then the job's stored
    /// value, then the configured default. Empty strings count as
    /// unset.
    pub fn resolve_model(&self, request: Option<&str>, job: &str) -> String {
        for candidate in [request.unwrap_or(""), job] {
            if !candidate.is_empty() {
                return candidate.to_string();
            }
        }
        self.default_model.clone()
    }
}

/// Errors from the Meshy adapter.
#[derive(Debug, thiserror::Error)]
pub enum MeshyError {
    /// No API credential is configured.
    #[error("Meshy provider is not configured (missing API key)")]
    Unconfigured,

    /// The resolved input image list was empty.
    #[error("No input images to submit")]
    NoImageInput,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Meshy returned a non-2xx status code.
    #[error("Meshy API error ({status}): {body}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx submission response that no known task-ID path matched.
    #[error("Meshy response contained no recognizable task id")]
    TaskIdMissing,
}

/// Caller-supplied generation options for `submit`.
#[derive(Debug, Default)]
pub struct SubmitOptions {
    /// Already-resolved vendor model selector.
    pub ai_model: String,
    pub target_polycount: Option<u32>,
}

/// Result of a successful submission.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub task_id: String,
    pub endpoint: Endpoint,
}

/// Result of a successful poll.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Endpoint that actually answered (may differ from the hint).
    pub endpoint: Endpoint,
    /// Raw provider status string, empty if the payload had none.
    pub raw_status: String,
    pub payload: Value,
}

/// HTTP client for the Meshy API.
pub struct MeshyClient {
    http: reqwest::Client,
    config: MeshyConfig,
}

impl MeshyClient {
    pub fn new(config: MeshyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (connection pooling with the artifact downloader).
    pub fn with_client(http: reqwest::Client, config: MeshyConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &MeshyConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str, MeshyError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(MeshyError::Unconfigured)
    }

    /// Submit a generation request.
    ///
    /// The endpoint is chosen from the image count; the caller never
    /// sees the single/multi split.
    pub async fn submit(
        &self,
        images: &[String],
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome, MeshyError> {
        let api_key = self.api_key()?;
        if images.is_empty() {
            return Err(MeshyError::NoImageInput);
        }

        let endpoint = Endpoint::for_image_count(images.len());
        let mut body = match endpoint {
            Endpoint::ImageTo3d => serde_json::json!({
                "image_url": images[0],
                "ai_model": options.ai_model,
                "should_texture": true,
            }),
            Endpoint::MultiImageTo3d => serde_json::json!({
                "image_urls": images,
                "ai_model": options.ai_model,
                "should_texture": true,
            }),
        };
        if let Some(polycount) = options.target_polycount {
            body["target_polycount"] = polycount.into();
        }

        let response = self
            .http
            .post(format!("{}{}", self.config.base_url, endpoint.path()))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let payload: Value = Self::parse_response(response).await?;
        let task_id = extract::extract_task_id(&payload).ok_or(MeshyError::TaskIdMissing)?;

        tracing::debug!(
            task_id = %task_id,
            endpoint = endpoint.path(),
            images = images.len(),
            "Meshy task submitted",
        );

        Ok(SubmitOutcome { task_id, endpoint })
    }

    /// Poll a task, tolerating a stale or missing endpoint hint.
    ///
    /// Tries the hinted endpoint first. Only a 404 triggers one retry
    /// against the alternate endpoint (the task may have been created
    /// by the other one); any other failure aborts immediately so real
    /// errors are never masked as retryable.
    pub async fn fetch(
        &self,
        task_id: &str,
        endpoint_hint: Option<Endpoint>,
    ) -> Result<FetchOutcome, MeshyError> {
        let first = endpoint_hint.unwrap_or(Endpoint::ImageTo3d);

        match self.fetch_from(task_id, first).await {
            Ok(outcome) => Ok(outcome),
            Err(MeshyError::RequestFailed { status: 404, .. }) => {
                let second = first.alternate();
                tracing::debug!(
                    task_id = %task_id,
                    tried = first.path(),
                    fallback = second.path(),
                    "Task not found on hinted endpoint, trying alternate",
                );
                self.fetch_from(task_id, second).await
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_from(
        &self,
        task_id: &str,
        endpoint: Endpoint,
    ) -> Result<FetchOutcome, MeshyError> {
        let api_key = self.api_key()?;

        let response = self
            .http
            .get(format!(
                "{}{}/{}",
                self.config.base_url,
                endpoint.path(),
                task_id
            ))
            .bearer_auth(api_key)
            .send()
            .await?;

        let payload: Value = Self::parse_response(response).await?;
        let raw_status = extract::extract_status(&payload).unwrap_or_default();

        Ok(FetchOutcome {
            endpoint,
            raw_status,
            payload,
        })
    }

    /// Parse a successful JSON response body, or surface the status and
    /// body text on failure.
    async fn parse_response(response: reqwest::Response) -> Result<Value, MeshyError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(MeshyError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> MeshyConfig {
        MeshyConfig {
            base_url: "https://api.meshy.ai".to_string(),
            api_key: api_key.map(String::from),
            default_model: "meshy-4".to_string(),
        }
    }

    #[test]
    fn model_override_order() {
        let cfg = config(Some("k"));
        assert_eq!(cfg.resolve_model(Some("meshy-5"), "meshy-3"), "meshy-5");
        assert_eq!(cfg.resolve_model(None, "meshy-3"), "meshy-3");
        assert_eq!(cfg.resolve_model(Some(""), ""), "meshy-4");
        assert_eq!(cfg.resolve_model(None, ""), "meshy-4");
    }

    #[tokio::test]
    async fn submit_without_credential_fails_fast() {
        let client = MeshyClient::new(config(None));
        let images = vec!["https://cdn.example.com/a.png".to_string()];
        assert_matches::assert_matches!(
            client.submit(&images, &SubmitOptions::default()).await,
            Err(MeshyError::Unconfigured)
        );
    }

    #[tokio::test]
    async fn submit_with_no_images_fails_fast() {
        let client = MeshyClient::new(config(Some("key")));
        assert_matches::assert_matches!(
            client.submit(&[], &SubmitOptions::default()).await,
            Err(MeshyError::NoImageInput)
        );
    }

    #[tokio::test]
    async fn fetch_without_credential_fails_fast() {
        let client = MeshyClient::new(config(Some("")));
        assert_matches::assert_matches!(
            client.fetch("task-1", None).await,
            Err(MeshyError::Unconfigured)
        );
    }
}
