//! Token lifecycle reconciliation.
//!
//! Decides whether a tracked token is still part of the managed state
//! given its last observed remote representation. The reference time is
//! always supplied by the caller so the decision is deterministic.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::token::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Keep,
    Remove { reason: String },
}

impl Outcome {
    pub fn is_remove(&self) -> bool {
        matches!(self, Outcome::Remove { .. })
    }

    /// Empty for `Keep`, never empty for `Remove`.
    pub fn reason(&self) -> &str {
        match self {
            Outcome::Keep => "",
            Outcome::Remove { reason } => reason,
        }
    }
}

/// Keep or drop `token` as of `now`. First matching rule wins:
/// any non-active status removes it, then an expiry strictly before `now`.
pub fn decide(token: &Token, now: DateTime<Utc>) -> Outcome {
    if !token.status.is_active() {
        return Outcome::Remove {
            reason: format!("non-active status \"{}\"", token.status),
        };
    }

    match token.expiration.deadline() {
        Some(expires_at) if expires_at < now => Outcome::Remove {
            reason: format!(
                "token expired at {}",
                expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        },
        _ => Outcome::Keep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::{Expiration, TokenScope, TokenStatus};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn token(id: &str, status: impl Into<TokenStatus>, expiration: Expiration) -> Token {
        Token {
            id: id.to_string(),
            name: "tf-acc-token".to_string(),
            status: status.into(),
            expiration,
            scope: TokenScope::default(),
            created_at: None,
        }
    }

    fn assert_removed_with(outcome: &Outcome, needle: &str) {
        assert!(outcome.is_remove(), "expected removal, got {:?}", outcome);
        assert!(
            outcome.reason().contains(needle),
            "reason {:?} should contain {:?}",
            outcome.reason(),
            needle
        );
    }

    #[test]
    fn test_active_with_future_expiry_is_kept() {
        let t = token("tok-1", "active", Expiration::at(now() + Duration::days(365)));
        assert_eq!(decide(&t, now()), Outcome::Keep);
        assert_eq!(decide(&t, now()).reason(), "");
    }

    #[test]
    fn test_active_with_far_future_expiry_is_kept() {
        let expiry = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        let t = token("tok-1b", "active", Expiration::at(expiry));
        assert_eq!(decide(&t, now()), Outcome::Keep);
    }

    #[test]
    fn test_active_without_expiry_is_kept() {
        let t = token("tok-2", "active", Expiration::never());
        assert_eq!(decide(&t, now()), Outcome::Keep);
    }

    #[test]
    fn test_unset_expiry_is_never_inspected() {
        // A stale past timestamp with is_set=false must be ignored.
        let t = token(
            "tok-2a",
            "active",
            Expiration {
                is_set: false,
                expires_at: Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            },
        );
        assert_eq!(decide(&t, now()), Outcome::Keep);
    }

    #[test]
    fn test_expiry_equal_to_now_is_kept() {
        let t = token("tok-2c", "active", Expiration::at(now()));
        assert_eq!(decide(&t, now()), Outcome::Keep);
    }

    #[test]
    fn test_revoked_is_removed_even_with_far_future_expiry() {
        let expiry = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        let t = token("tok-3b", "revoked", Expiration::at(expiry));
        let outcome = decide(&t, now());
        assert_eq!(
            outcome,
            Outcome::Remove {
                reason: "non-active status \"revoked\"".into()
            }
        );
    }

    #[test]
    fn test_expired_status_wins_over_expiry_check() {
        let t = token("tok-4", "expired", Expiration::at(now() - Duration::days(1)));
        assert_removed_with(&decide(&t, now()), "non-active status \"expired\"");
    }

    #[test]
    fn test_deleted_status_is_removed() {
        let t = token("tok-5", "deleted", Expiration::never());
        assert_removed_with(&decide(&t, now()), "non-active status \"deleted\"");
    }

    #[test]
    fn test_unknown_status_is_removed_verbatim() {
        let t = token("tok-8", "some-unknown-status", Expiration::never());
        assert_removed_with(&decide(&t, now()), "non-active status \"some-unknown-status\"");
    }

    #[test]
    fn test_active_past_expiry_is_removed() {
        let cases = [
            now() - Duration::seconds(1),
            now() - Duration::days(1),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        ];
        for expiry in cases {
            let t = token("tok-6", "active", Expiration::at(expiry));
            let outcome = decide(&t, now());
            assert_removed_with(&outcome, "expired at");
            assert!(outcome
                .reason()
                .contains(&expiry.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
    }

    #[test]
    fn test_decide_is_repeatable() {
        let t = token("tok-7", "active", Expiration::at(now() - Duration::hours(3)));
        assert_eq!(decide(&t, now()), decide(&t, now()));
    }
}
