//! Background job: periodic reconciliation of tracked registry tokens.
//!
//! Each pass captures the current time once, refreshes every tracked
//! token against it, logs the resulting diagnostics and persists the
//! state file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::client::TokenApi;
use crate::resource::{Diagnostic, Severity, TokenResource};

/// Spawn the periodic refresh task. The first pass runs immediately.
pub fn spawn<A>(resource: Arc<TokenResource<A>>, state_path: PathBuf, period: Duration) -> JoinHandle<()>
where
    A: TokenApi + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = run_once(resource.as_ref(), &state_path).await {
                tracing::error!("token refresh job failed: {}", e);
            }
        }
    })
}

/// One reconciliation pass. Returns the diagnostics it emitted.
pub async fn run_once<A: TokenApi>(
    resource: &TokenResource<A>,
    state_path: &Path,
) -> anyhow::Result<Vec<Diagnostic>> {
    let now = Utc::now();
    let before = resource.state().len();

    let diagnostics = resource.refresh_all(now).await;
    for d in &diagnostics {
        log_diagnostic(d);
    }

    resource.state().save(state_path).await?;

    let removed = before.saturating_sub(resource.state().len());
    if removed > 0 {
        tracing::info!(removed, remaining = resource.state().len(), "pruned tracked tokens");
    } else {
        tracing::debug!(tracked = before, "token refresh pass complete");
    }

    Ok(diagnostics)
}

pub fn log_diagnostic(d: &Diagnostic) {
    match d.severity {
        Severity::Warning => tracing::warn!(
            token_id = %d.token_id,
            detail = %d.detail,
            "{}",
            d.summary
        ),
        Severity::Error => tracing::error!(
            token_id = %d.token_id,
            detail = %d.detail,
            "{}",
            d.summary
        ),
    }
}
