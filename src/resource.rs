//! Registry token resource handlers.
//!
//! Create/read/update/delete glue between the remote API and the tracked
//! state. Reads run the lifecycle reconciler; deletes treat "already
//! gone" as success.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{CreateTokenRequest, TokenApi, UpdateTokenRequest};
use crate::errors::AppError;
use crate::models::token::{Expiration, Token, TokenScope, TOKEN_USERNAME};
use crate::reconcile::{self, Outcome};
use crate::state::{TokenState, TrackedState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Operator-facing message from a handler. Never fails the run by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub token_id: String,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn warning(token_id: &str, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            token_id: token_id.to_string(),
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn error(token_id: &str, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            token_id: token_id.to_string(),
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

/// Desired configuration of a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSpec {
    pub name: String,
    pub mode_rw: bool,
    pub all_registries: bool,
    pub registry_ids: Vec<String>,
    pub is_set: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSpec {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".into()));
        }
        match (self.all_registries, self.registry_ids.is_empty()) {
            (true, false) => {
                return Err(AppError::Validation(
                    "all_registries conflicts with registry_ids".into(),
                ))
            }
            (false, true) => {
                return Err(AppError::Validation(
                    "either all_registries or registry_ids must be set".into(),
                ))
            }
            _ => {}
        }
        if self.is_set && self.expires_at.is_none() {
            return Err(AppError::Validation("is_set requires expires_at".into()));
        }
        Ok(())
    }

    pub fn expiration(&self) -> Expiration {
        match (self.is_set, self.expires_at) {
            (true, Some(at)) => Expiration::at(at),
            _ => Expiration::never(),
        }
    }

    pub fn scope(&self) -> TokenScope {
        TokenScope {
            mode_rw: self.mode_rw,
            all_registries: self.all_registries,
            registry_ids: self.registry_ids.clone(),
        }
    }

    /// Fields that differ from the tracked entry.
    fn diff(&self, current: &TokenState) -> UpdateTokenRequest {
        let mut req = UpdateTokenRequest::default();
        if self.name != current.name {
            req.name = Some(self.name.clone());
        }
        if self.mode_rw != current.mode_rw
            || self.all_registries != current.all_registries
            || self.registry_ids != current.registry_ids
        {
            req.scope = Some(self.scope());
        }
        let expiration = self.expiration();
        if expiration.is_set != current.is_set || expiration.deadline() != current.expires_at {
            req.expiration = Some(expiration);
        }
        req
    }
}

pub struct TokenResource<A> {
    api: A,
    state: Arc<TrackedState>,
}

impl<A: TokenApi> TokenResource<A> {
    pub fn new(api: A, state: Arc<TrackedState>) -> Self {
        Self { api, state }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &Arc<TrackedState> {
        &self.state
    }

    pub async fn create(&self, project_id: Uuid, spec: &TokenSpec) -> Result<TokenState, AppError> {
        spec.validate()?;

        let created = self
            .api
            .create_token(&CreateTokenRequest {
                name: spec.name.clone(),
                expiration: spec.expiration(),
                scope: spec.scope(),
            })
            .await?;

        let mut tracked = TokenState {
            id: created.token.id.clone(),
            project_id,
            name: spec.name.clone(),
            mode_rw: spec.mode_rw,
            all_registries: spec.all_registries,
            registry_ids: spec.registry_ids.clone(),
            is_set: false,
            expires_at: None,
            token: created.secret,
            username: TOKEN_USERNAME.to_string(),
        };
        tracked.refresh_from(&created.token);
        self.state.insert(tracked.clone());

        info!(token_id = %tracked.id, project_id = %project_id, "created registry token");
        Ok(tracked)
    }

    /// Refresh one tracked token against `now`.
    ///
    /// Returns a warning diagnostic when the token was dropped from state
    /// because it vanished remotely, is no longer active, or has expired.
    pub async fn read(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Diagnostic>, AppError> {
        if !self.state.contains(id) {
            return Err(AppError::NotTracked(id.to_string()));
        }

        let token = match self.api.get_token(id).await {
            Ok(token) if token.id == id => token,
            Ok(token) => {
                return Ok(Some(self.drop_missing(
                    id,
                    format!("API returned token {} for {}", token.id, id),
                )))
            }
            Err(e) if e.is_not_found() => return Ok(Some(self.drop_missing(id, e.to_string()))),
            Err(e) => return Err(e.into()),
        };

        Ok(self.reconcile(id, token, now))
    }

    fn drop_missing(&self, id: &str, detail: String) -> Diagnostic {
        self.state.remove(id);
        warn!(token_id = %id, detail = %detail, "token not found remotely, removed from state");
        Diagnostic::warning(id, "token not found, removing from state", detail)
    }

    fn reconcile(&self, id: &str, token: Token, now: DateTime<Utc>) -> Option<Diagnostic> {
        match reconcile::decide(&token, now) {
            Outcome::Keep => {
                self.state.update(id, |tracked| tracked.refresh_from(&token));
                None
            }
            Outcome::Remove { reason } => {
                self.state.remove(id);
                warn!(token_id = %id, reason = %reason, "removing token from state");
                Some(Diagnostic::warning(
                    id,
                    format!("registry token {} removed from state", id),
                    reason,
                ))
            }
        }
    }

    /// Refresh every tracked token against one instant.
    ///
    /// A failed fetch becomes an error diagnostic and leaves that entry
    /// untouched; the rest of the pass continues.
    pub async fn refresh_all(&self, now: DateTime<Utc>) -> Vec<Diagnostic> {
        let ids = self.state.ids();
        let results = join_all(ids.iter().map(|id| self.read(id, now))).await;

        ids.iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(diag) => diag,
                Err(e) => Some(Diagnostic::error(id, "failed to refresh token", e.to_string())),
            })
            .collect()
    }

    pub async fn update(&self, id: &str, spec: &TokenSpec) -> Result<TokenState, AppError> {
        spec.validate()?;
        let current = self
            .state
            .get(id)
            .ok_or_else(|| AppError::NotTracked(id.to_string()))?;

        let req = spec.diff(&current);
        if req.is_empty() {
            debug!(token_id = %id, "no changes to apply");
            return Ok(current);
        }

        let token = self.api.update_token(id, &req).await?;
        self.state.update(id, |tracked| tracked.refresh_from(&token));
        info!(token_id = %id, "updated registry token");

        self.state
            .get(id)
            .ok_or_else(|| AppError::NotTracked(id.to_string()))
    }

    /// Delete a token. A 404 means it is already gone and counts as success.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        match self.api.delete_token(id).await {
            Ok(resp) => debug!(token_id = %id, status = %resp.status, "deleted registry token"),
            Err(e) if e.is_not_found() => {
                info!(token_id = %id, "registry token already deleted")
            }
            Err(e) => return Err(e.into()),
        }
        self.state.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TokenSpec {
        TokenSpec {
            name: "ci-pull".into(),
            all_registries: true,
            ..Default::default()
        }
    }

    fn tracked() -> TokenState {
        TokenState {
            id: "tok-1".into(),
            project_id: Uuid::nil(),
            name: "ci-pull".into(),
            mode_rw: false,
            all_registries: true,
            registry_ids: vec![],
            is_set: false,
            expires_at: None,
            token: "secret".into(),
            username: TOKEN_USERNAME.into(),
        }
    }

    #[test]
    fn test_valid_spec() {
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let s = TokenSpec {
            name: "  ".into(),
            ..spec()
        };
        assert!(matches!(s.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_registry_scope_rules() {
        let both = TokenSpec {
            registry_ids: vec!["reg-1".into()],
            ..spec()
        };
        assert!(both.validate().is_err());

        let neither = TokenSpec {
            all_registries: false,
            ..spec()
        };
        assert!(neither.validate().is_err());

        let listed = TokenSpec {
            all_registries: false,
            registry_ids: vec!["reg-1".into()],
            ..spec()
        };
        assert!(listed.validate().is_ok());
    }

    #[test]
    fn test_is_set_requires_timestamp() {
        let s = TokenSpec {
            is_set: true,
            ..spec()
        };
        assert!(s.validate().is_err());
        assert_eq!(s.expiration(), Expiration::never());
    }

    #[test]
    fn test_diff_only_changed_fields() {
        let renamed = TokenSpec {
            name: "ci-push".into(),
            ..spec()
        };
        let req = renamed.diff(&tracked());
        assert_eq!(req.name.as_deref(), Some("ci-push"));
        assert!(req.scope.is_none());
        assert!(req.expiration.is_none());

        assert!(spec().diff(&tracked()).is_empty());
    }

    #[test]
    fn test_diagnostic_serializes_severity() {
        let d = Diagnostic::warning("tok-1", "removed", "non-active status \"revoked\"");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["detail"], "non-active status \"revoked\"");
    }
}
