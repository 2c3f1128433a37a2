//! Tracked state: the local record of tokens this tool manages.
//!
//! Held in memory as a concurrent map and persisted as a JSON file so
//! separate CLI runs share the same view.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::token::Token;

const STATE_VERSION: u32 = 1;

/// Tracked attributes of one managed token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenState {
    pub id: String,
    pub project_id: Uuid,
    pub name: String,
    pub mode_rw: bool,
    pub all_registries: bool,
    #[serde(default)]
    pub registry_ids: Vec<String>,
    pub is_set: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Secret value, only known from the create response.
    pub token: String,
    pub username: String,
}

impl TokenState {
    /// Copy observed attributes; project, secret and username are kept.
    pub fn refresh_from(&mut self, token: &Token) {
        self.name = token.name.clone();
        self.mode_rw = token.scope.mode_rw;
        self.all_registries = token.scope.all_registries;
        self.registry_ids = token.scope.registry_ids.clone();
        self.is_set = token.expiration.is_set;
        self.expires_at = token.expiration.deadline();
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("id", &self.id)
            .field("project_id", &self.project_id)
            .field("name", &self.name)
            .field("mode_rw", &self.mode_rw)
            .field("all_registries", &self.all_registries)
            .field("registry_ids", &self.registry_ids)
            .field("is_set", &self.is_set)
            .field("expires_at", &self.expires_at)
            .field("token", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct StateFile {
    version: u32,
    tokens: Vec<TokenState>,
}

#[derive(Debug, Default)]
pub struct TrackedState {
    tokens: DashMap<String, TokenState>,
}

impl TrackedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state: TokenState) {
        self.tokens.insert(state.id.clone(), state);
    }

    pub fn get(&self, id: &str) -> Option<TokenState> {
        self.tokens.get(id).map(|entry| entry.value().clone())
    }

    /// Apply `f` to a tracked entry in place. Returns false if untracked.
    pub fn update<F: FnOnce(&mut TokenState)>(&self, id: &str, f: F) -> bool {
        match self.tokens.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<TokenState> {
        self.tokens.remove(id).map(|(_, state)| state)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tokens.contains_key(id)
    }

    /// Tracked ids, sorted for stable output.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tokens.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Load from `path`. A missing file is an empty state.
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no state file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: StateFile = serde_json::from_slice(&raw)?;
        if file.version != STATE_VERSION {
            return Err(AppError::Internal(anyhow::anyhow!(
                "unsupported state file version {} (expected {})",
                file.version,
                STATE_VERSION
            )));
        }

        let state = Self::new();
        for token in file.tokens {
            state.insert(token);
        }
        Ok(state)
    }

    /// Write to `path` via a temporary sibling file and rename.
    pub async fn save(&self, path: &Path) -> Result<(), AppError> {
        let mut tokens: Vec<TokenState> = self.tokens.iter().map(|e| e.value().clone()).collect();
        tokens.sort_by(|a, b| a.id.cmp(&b.id));

        let body = serde_json::to_vec_pretty(&StateFile {
            version: STATE_VERSION,
            tokens,
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
