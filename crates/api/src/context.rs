use chrono::{DateTime, Utc};

use guestlist_auth::{Role, Session};
use guestlist_core::UserId;

/// Session context for a request.
///
/// Inserted by the gate middleware. On restricted routes the role has just
/// been re-read from the directory; on public routes it is the token's hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session: Session,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn user_id(&self) -> UserId {
        self.session.user_id
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.session.established_at
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
