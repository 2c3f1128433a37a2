use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use url::Url;
use uuid::Uuid;

pub const DEFAULT_ENDPOINT: &str = "https://cr.selcloud.ru/api/v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    auth_token: Option<String>,
    /// Default project for `token create` when `--project-id` is omitted.
    pub project_id: Option<Uuid>,
    pub state_file: PathBuf,
    /// Period of the `watch` loop. Set via CRAAS_REFRESH_INTERVAL_SECS. Default: 300.
    pub refresh_interval: Duration,
    /// Per-request HTTP timeout. Set via CRAAS_REQUEST_TIMEOUT_SECS. Default: 30.
    pub request_timeout: Duration,
    /// Emit JSON log lines (CRAAS_LOG_FORMAT=json).
    pub json_logs: bool,
}

impl Config {
    /// Returns the API token, required for every remote call.
    pub fn auth_token(&self) -> anyhow::Result<&str> {
        self.auth_token
            .as_deref()
            .context("CRAAS_AUTH_TOKEN is not set")
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from any variable source; `load` uses the process env.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let raw_endpoint = lookup("CRAAS_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.into());
    let endpoint = Url::parse(&raw_endpoint)
        .with_context(|| format!("CRAAS_ENDPOINT is not a valid URL: {}", raw_endpoint))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        anyhow::bail!("CRAAS_ENDPOINT must be http(s), got {}", endpoint.scheme());
    }

    let project_id = match lookup("CRAAS_PROJECT_ID").filter(|v| !v.trim().is_empty()) {
        Some(raw) => Some(
            Uuid::parse_str(raw.trim())
                .with_context(|| format!("CRAAS_PROJECT_ID is not a valid UUID: {}", raw))?,
        ),
        None => None,
    };

    Ok(Config {
        endpoint,
        auth_token: lookup("CRAAS_AUTH_TOKEN").filter(|v| !v.is_empty()),
        project_id,
        state_file: lookup("CRAAS_STATE_FILE")
            .unwrap_or_else(|| "craas-state.json".into())
            .into(),
        refresh_interval: Duration::from_secs(
            lookup("CRAAS_REFRESH_INTERVAL_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(300),
        ),
        request_timeout: Duration::from_secs(
            lookup("CRAAS_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(30),
        ),
        json_logs: lookup("CRAAS_LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
    })
}
