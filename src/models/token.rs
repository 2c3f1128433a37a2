// Registry token v2 as reported by the CRaaS API.
// The token secret is never part of this snapshot; it is only returned on creation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Login username shared by every v2 registry token.
pub const TOKEN_USERNAME: &str = "token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: TokenStatus,
    #[serde(default)]
    pub expiration: Expiration,
    #[serde(default)]
    pub scope: TokenScope,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of a token.
///
/// Statuses this crate does not know about are kept verbatim in `Other`
/// so they can be reported back exactly as the API sent them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenStatus {
    Active,
    Expired,
    Revoked,
    Deleted,
    Other(String),
}

impl TokenStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TokenStatus::Active => "active",
            TokenStatus::Expired => "expired",
            TokenStatus::Revoked => "revoked",
            TokenStatus::Deleted => "deleted",
            TokenStatus::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TokenStatus::Active)
    }
}

impl From<&str> for TokenStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => TokenStatus::Active,
            "expired" => TokenStatus::Expired,
            "revoked" => TokenStatus::Revoked,
            "deleted" => TokenStatus::Deleted,
            other => TokenStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for TokenStatus {
    fn from(s: String) -> Self {
        match TokenStatus::from(s.as_str()) {
            TokenStatus::Other(_) => TokenStatus::Other(s),
            known => known,
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TokenStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TokenStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(TokenStatus::from)
    }
}

/// Optional expiration. `expires_at` carries no meaning unless `is_set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expiration {
    #[serde(default)]
    pub is_set: bool,
    #[serde(default = "epoch")]
    pub expires_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Expiration {
    pub fn never() -> Self {
        Self {
            is_set: false,
            expires_at: epoch(),
        }
    }

    pub fn at(expires_at: DateTime<Utc>) -> Self {
        Self {
            is_set: true,
            expires_at,
        }
    }

    /// The expiry instant, if the token has one.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.is_set.then_some(self.expires_at)
    }
}

impl Default for Expiration {
    fn default() -> Self {
        Self::never()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenScope {
    #[serde(rename = "modeRW", default)]
    pub mode_rw: bool,
    #[serde(rename = "allRegistries", default)]
    pub all_registries: bool,
    #[serde(rename = "registryIds", default)]
    pub registry_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_known_statuses_parse() {
        assert_eq!(TokenStatus::from("active"), TokenStatus::Active);
        assert_eq!(TokenStatus::from("expired"), TokenStatus::Expired);
        assert_eq!(TokenStatus::from("revoked"), TokenStatus::Revoked);
        assert_eq!(TokenStatus::from("deleted"), TokenStatus::Deleted);
    }

    #[test]
    fn test_status_match_is_case_sensitive() {
        let status = TokenStatus::from("Active");
        assert_eq!(status, TokenStatus::Other("Active".into()));
        assert!(!status.is_active());
    }

    #[test]
    fn test_unknown_status_survives_serde() {
        let status: TokenStatus = serde_json::from_str("\"suspended\"").unwrap();
        assert_eq!(status, TokenStatus::Other("suspended".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"suspended\"");
    }

    #[test]
    fn test_token_deserializes_from_api_json() {
        let json = serde_json::json!({
            "id": "0f7a3b2c",
            "name": "ci-pull",
            "status": "active",
            "createdAt": "2025-01-10T08:00:00Z",
            "expiration": { "isSet": true, "expiresAt": "2030-01-01T00:00:00Z" },
            "scope": { "modeRW": true, "allRegistries": true, "registryIds": [] }
        });
        let token: Token = serde_json::from_value(json).unwrap();
        assert_eq!(token.status, TokenStatus::Active);
        assert!(token.scope.mode_rw);
        assert_eq!(
            token.expiration.deadline(),
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unset_expiration_has_no_deadline() {
        let json = serde_json::json!({ "id": "t", "status": "active", "expiration": { "isSet": false } });
        let token: Token = serde_json::from_value(json).unwrap();
        assert_eq!(token.expiration, Expiration::never());
        assert!(token.expiration.deadline().is_none());
    }

    #[test]
    fn test_missing_is_set_means_unset() {
        let json = serde_json::json!({
            "id": "t",
            "status": "active",
            "expiration": { "expiresAt": "2000-01-01T00:00:00Z" }
        });
        let token: Token = serde_json::from_value(json).unwrap();
        assert!(!token.expiration.is_set);
        assert!(token.expiration.deadline().is_none());
    }
}
