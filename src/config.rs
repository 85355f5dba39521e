use anyhow::{Context, Result};
use reqwest::Url;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend REST API, e.g. "https://api.example.com".
    /// Stored without a trailing slash.
    pub api_base_url: String,

    /// Public base URL short links are served from, used for display, copy
    /// and open actions. Defaults to `api_base_url`.
    pub copy_base_url: String,

    /// JSON file holding the persisted `user` / `Admin` session slots
    pub session_file: PathBuf,

    /// Per-request timeout for backend calls
    pub request_timeout: Duration,

    /// How long a "copied" flag stays active
    pub copy_feedback: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var("BACKEND_API_URL")
            .context("BACKEND_API_URL must be set in the environment or .env file")?;
        let api_base_url = normalize_base_url(&api_base_url)
            .context("BACKEND_API_URL must be an absolute http(s) URL")?;

        let copy_base_url = match std::env::var("BACKEND_API_URL_COPY") {
            Ok(raw) => normalize_base_url(&raw)
                .context("BACKEND_API_URL_COPY must be an absolute http(s) URL")?,
            Err(_) => api_base_url.clone(),
        };

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse::<u64>()
            .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;

        let copy_feedback_ms = std::env::var("COPY_FEEDBACK_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse::<u64>()
            .unwrap_or(2000);

        Ok(Self {
            api_base_url,
            copy_base_url,
            session_file: std::env::var("SESSION_FILE")
                .unwrap_or_else(|_| "./linkdeck-session.json".into())
                .into(),
            request_timeout: Duration::from_secs(request_timeout_secs),
            copy_feedback: Duration::from_millis(copy_feedback_ms),
        })
    }

    /// Configuration pointing both bases at `base_url`, with default timings.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let api_base_url = normalize_base_url(base_url)?;
        Ok(Self {
            copy_base_url: api_base_url.clone(),
            api_base_url,
            session_file: "./linkdeck-session.json".into(),
            request_timeout: Duration::from_secs(10),
            copy_feedback: Duration::from_millis(2000),
        })
    }
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).with_context(|| format!("invalid URL: {trimmed}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("URL must use http or https: {trimmed}");
    }
    Ok(trimmed.trim_end_matches('/').to_owned())
}
