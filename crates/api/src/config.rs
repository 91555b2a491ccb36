use std::path::PathBuf;

use mesa_meshy::MeshyConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development,
/// except the provider credential, which stays unset until configured.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`). Provider calls
    /// and artifact downloads are synchronous to the caller, so this
    /// is deliberately generous.
    pub request_timeout_secs: u64,
    /// Root directory of the local blob store.
    pub storage_root: PathBuf,
    /// Meshy adapter configuration (base URL, credential, default model).
    pub meshy: MeshyConfig,
    /// Maximum reference images sent per generation request.
    pub max_reference_images: usize,
    /// Maximum files accepted by one reference-image upload call.
    pub upload_max_files: usize,
    /// Per-file size ceiling for reference-image uploads, in bytes.
    pub upload_max_bytes: usize,
    /// Session lifetime in hours.
    pub session_ttl_hours: i64,
    /// Interval between expired-session sweeps, in seconds.
    pub session_sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `HOST`                   | `0.0.0.0`                |
    /// | `PORT`                   | `3000`                   |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`   | `60`                     |
    /// | `STORAGE_ROOT`           | `./storage`              |
    /// | `MESHY_API_URL`          | `https://api.meshy.ai`   |
    /// | `MESHY_API_KEY`          | unset                    |
    /// | `AI_DEFAULT_MODEL`       | `meshy-4`                |
    /// | `MAX_REFERENCE_IMAGES`   | `4`                      |
    /// | `UPLOAD_MAX_FILES`       | `20`                     |
    /// | `UPLOAD_MAX_BYTES`       | `8388608` (8 MiB)        |
    /// | `SESSION_TTL_HOURS`      | `168` (7 days)           |
    /// | `SESSION_SWEEP_INTERVAL_SECS` | `3600`              |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_parsed("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let meshy = MeshyConfig {
            base_url: std::env::var("MESHY_API_URL")
                .unwrap_or_else(|_| "https://api.meshy.ai".into()),
            api_key: std::env::var("MESHY_API_KEY").ok().filter(|k| !k.is_empty()),
            default_model: std::env::var("AI_DEFAULT_MODEL").unwrap_or_else(|_| "meshy-4".into()),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS", 60),
            storage_root: std::env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "./storage".into())
                .into(),
            meshy,
            max_reference_images: env_parsed("MAX_REFERENCE_IMAGES", 4),
            upload_max_files: env_parsed("UPLOAD_MAX_FILES", 20),
            upload_max_bytes: env_parsed("UPLOAD_MAX_BYTES", 8 * 1024 * 1024),
            session_ttl_hours: env_parsed("SESSION_TTL_HOURS", 168),
            session_sweep_interval_secs: env_parsed("SESSION_SWEEP_INTERVAL_SECS", 3600),
        }
    }
}

/// Parse an env var, panicking on malformed values (fail fast at
/// startup) and falling back to `default` when unset.
fn env_parsed<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|e| panic!("{var} is invalid: {e}")),
        Err(_) => default,
    }
}
