//! Signed session tokens (the Identity Session Provider boundary).
//!
//! Two token kinds share one HS256 key:
//! - identity assertions, minted by the identity provider once credentials
//!   are verified, carrying only the subject;
//! - session tokens, minted here at sign-in, carrying the cached role.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use guestlist_auth::{ClaimsError, Session, SessionClaims, validate_claims, validate_window};
use guestlist_core::UserId;
use guestlist_infra::config::MAX_SESSION_TTL;

/// Claims of a verified-identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    pub sub: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("malformed or unsigned token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] ClaimsError),
}

pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionTokens {
    pub fn new(secret: &[u8], ttl: std::time::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time windows are checked by `validate_claims` on our own claim names.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: session_ttl(ttl),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, session: &Session) -> Result<String, SessionTokenError> {
        let claims = SessionClaims::for_session(session, self.ttl);
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Session, SessionTokenError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims.session())
    }

    pub fn verify_identity(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, SessionTokenError> {
        let data = jsonwebtoken::decode::<IdentityAssertion>(token, &self.decoding, &self.validation)?;
        let a = data.claims;
        validate_window(a.issued_at, a.expires_at, now)?;
        Ok(a.sub)
    }
}

/// Convert the configured lifetime, clamping to [`MAX_SESSION_TTL`].
fn session_ttl(ttl: std::time::Duration) -> Duration {
    let capped = if ttl > MAX_SESSION_TTL {
        tracing::warn!(
            requested_secs = ttl.as_secs(),
            max_secs = MAX_SESSION_TTL.as_secs(),
            "session ttl above maximum; clamping"
        );
        MAX_SESSION_TTL
    } else {
        ttl
    };
    Duration::from_std(capped).unwrap_or(Duration::days(365))
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestlist_auth::Role;

    fn tokens() -> SessionTokens {
        SessionTokens::new(b"test-secret", std::time::Duration::from_secs(600))
    }

    #[test]
    fn issued_session_verifies() {
        let t = tokens();
        let now = Utc::now();
        let session = Session::new(UserId::new(), Role::Pending, now);
        let token = t.issue(&session).unwrap();
        assert_eq!(t.verify(&token, now).unwrap(), session);
    }

    #[test]
    fn expired_session_rejected() {
        let t = tokens();
        let now = Utc::now();
        let token = t.issue(&Session::new(UserId::new(), Role::Approved, now)).unwrap();
        let later = now + Duration::minutes(11);
        assert!(matches!(
            t.verify(&token, later),
            Err(SessionTokenError::Claims(ClaimsError::Expired))
        ));
    }

    #[test]
    fn foreign_key_rejected() {
        let now = Utc::now();
        let token = tokens()
            .issue(&Session::new(UserId::new(), Role::Admin, now))
            .unwrap();
        let other = SessionTokens::new(b"other-secret", std::time::Duration::from_secs(600));
        assert!(matches!(other.verify(&token, now), Err(SessionTokenError::Decode(_))));
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let t = SessionTokens::new(b"test-secret", std::time::Duration::from_secs(u64::MAX));
        assert_eq!(t.ttl(), Duration::from_std(MAX_SESSION_TTL).unwrap());

        // Issuing must not overflow the expiry timestamp.
        let now = Utc::now();
        let token = t.issue(&Session::new(UserId::new(), Role::Pending, now)).unwrap();
        assert!(t.verify(&token, now).is_ok());
    }

    #[test]
    fn expired_identity_assertion_rejected() {
        let now = Utc::now();
        let assertion = IdentityAssertion {
            sub: UserId::new(),
            issued_at: now - Duration::minutes(10),
            expires_at: now - Duration::minutes(5),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &assertion,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(
            tokens().verify_identity(&token, now),
            Err(SessionTokenError::Claims(ClaimsError::Expired))
        ));
    }

    #[test]
    fn identity_assertion_yields_subject() {
        let now = Utc::now();
        let sub = UserId::new();
        let assertion = IdentityAssertion {
            sub,
            issued_at: now,
            expires_at: now + Duration::minutes(5),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &assertion,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(tokens().verify_identity(&token, now).unwrap(), sub);
    }
}
