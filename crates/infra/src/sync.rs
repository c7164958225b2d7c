//! Session Role Synchronizer.
//!
//! A session's role is a hint. Every authorization-sensitive check re-reads
//! the role from the directory and writes it back into the session before
//! the decision is made.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use guestlist_auth::{Role, Session};
use guestlist_core::UserId;

use crate::directory::{DirectoryError, UserDirectory};
use crate::resync::ResyncMarks;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The session refers to a user the directory does not know.
    #[error("session user {0} not found in directory")]
    NotFound(UserId),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for SyncError {
    fn from(value: DirectoryError) -> Self {
        // Corrupt data is as unusable as no data: fail closed either way.
        match value {
            DirectoryError::Unavailable(msg) | DirectoryError::Corrupt(msg) => Self::Unavailable(msg),
        }
    }
}

pub struct SessionRoleSynchronizer<D> {
    directory: D,
    marks: Arc<ResyncMarks>,
}

impl<D> SessionRoleSynchronizer<D>
where
    D: UserDirectory,
{
    pub fn new(directory: D, marks: Arc<ResyncMarks>) -> Self {
        Self { directory, marks }
    }

    /// Read the authoritative role and refresh the session's hint with it.
    pub async fn fresh_role(&self, session: &mut Session) -> Result<Role, SyncError> {
        let role = self
            .directory
            .get_role(session.user_id)
            .await?
            .ok_or(SyncError::NotFound(session.user_id))?;

        let previous = session.role;
        let marked_at = self.marks.take(session.user_id);
        if session.refresh(role, Utc::now()) {
            tracing::debug!(
                user_id = %session.user_id,
                from = %previous,
                to = %role,
                marked_at = ?marked_at,
                "session role hint was stale; refreshed"
            );
        }

        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use crate::testing::DownDirectory;

    #[tokio::test]
    async fn stale_hint_is_replaced_and_mark_consumed() {
        let dir = Arc::new(InMemoryUserDirectory::new());
        let marks = Arc::new(ResyncMarks::new());
        let id = UserId::new();
        let t0 = Utc::now();
        dir.enroll(id, t0).await.unwrap();
        let mut session = Session::new(id, Role::Pending, t0);

        dir.compare_and_set_role(id, Role::Pending, Role::Approved, Utc::now())
            .await
            .unwrap();
        marks.mark(id, Utc::now());

        let sync = SessionRoleSynchronizer::new(dir.clone(), marks.clone());
        let role = sync.fresh_role(&mut session).await.unwrap();

        assert_eq!(role, Role::Approved);
        assert_eq!(session.role, Role::Approved);
        assert!(session.established_at >= t0);
        assert!(marks.peek(id).is_none());
    }

    #[tokio::test]
    async fn hint_is_never_trusted_even_when_newer() {
        let dir = Arc::new(InMemoryUserDirectory::new());
        let id = UserId::new();
        dir.enroll(id, Utc::now()).await.unwrap();

        // A forged or outdated hint claiming membership.
        let mut session = Session::new(id, Role::Admin, Utc::now());
        let sync = SessionRoleSynchronizer::new(dir, Arc::new(ResyncMarks::new()));

        assert_eq!(sync.fresh_role(&mut session).await.unwrap(), Role::Pending);
        assert_eq!(session.role, Role::Pending);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let sync = SessionRoleSynchronizer::new(
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(ResyncMarks::new()),
        );
        let id = UserId::new();
        let mut session = Session::new(id, Role::Approved, Utc::now());
        assert_eq!(sync.fresh_role(&mut session).await, Err(SyncError::NotFound(id)));
        // Hint untouched on failure.
        assert_eq!(session.role, Role::Approved);
    }

    #[tokio::test]
    async fn unreachable_directory_is_unavailable() {
        let sync = SessionRoleSynchronizer::new(DownDirectory, Arc::new(ResyncMarks::new()));
        let mut session = Session::new(UserId::new(), Role::Approved, Utc::now());
        assert!(matches!(
            sync.fresh_role(&mut session).await,
            Err(SyncError::Unavailable(_))
        ));
    }
}
