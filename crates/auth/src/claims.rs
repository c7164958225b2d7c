use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use guestlist_core::UserId;

use crate::Role;

/// A per-request view of a signed-in user.
///
/// `role` is a cached hint captured at `established_at`; it is never
/// authoritative for writes and is re-validated against the directory before
/// any authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub role: Role,
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, role: Role, established_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role,
            established_at,
        }
    }

    /// Replace the cached role with a freshly read one.
    ///
    /// Returns `true` when the hint was stale.
    pub fn refresh(&mut self, role: Role, at: DateTime<Utc>) -> bool {
        let changed = self.role != role;
        self.role = role;
        self.established_at = at;
        changed
    }
}

/// Session token claims model (transport-agnostic).
///
/// This is the minimal set of claims expected once a token has been
/// decoded/verified by whatever transport/security layer is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / directory user identifier.
    pub sub: UserId,

    /// Cached lifecycle role.
    pub role: Role,

    /// When `role` was captured.
    pub established_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn for_session(session: &Session, ttl: Duration) -> Self {
        Self {
            sub: session.user_id,
            role: session.role,
            established_at: session.established_at,
            expires_at: session.established_at + ttl,
        }
    }

    pub fn session(&self) -> Session {
        Session::new(self.sub, self.role, self.established_at)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (expiry is not after issuance)")]
    InvalidTimeWindow,
}

/// Check that `now` falls inside the half-open window `[start, end)`.
///
/// Shared by every signed token the site accepts.
pub fn validate_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ClaimsError> {
    if end <= start {
        return Err(ClaimsError::InvalidTimeWindow);
    }
    if now < start {
        return Err(ClaimsError::NotYetValid);
    }
    if now >= end {
        return Err(ClaimsError::Expired);
    }
    Ok(())
}

/// Deterministically validate session claims.
///
/// Checks the *claims* only; decoding and signature checks happen in the
/// token codec before this is called.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    validate_window(claims.established_at, claims.expires_at, now)
}
