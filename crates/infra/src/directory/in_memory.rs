use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use guestlist_auth::{Role, User};
use guestlist_core::UserId;

use super::{CasOutcome, DirectoryError, UserDirectory};

/// In-memory user directory.
///
/// Intended for tests/dev. The compare-and-set runs entirely under the write
/// lock, so concurrent transitions on one user serialize here.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DirectoryError {
        DirectoryError::Unavailable("lock poisoned".to_string())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get(&self, user_id: UserId) -> Result<Option<User>, DirectoryError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        Ok(users.get(&user_id).cloned())
    }

    async fn compare_and_set_role(
        &self,
        user_id: UserId,
        expected: Role,
        new: Role,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, DirectoryError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(CasOutcome::NotFound);
        };
        if user.role != expected {
            return Ok(CasOutcome::Stale);
        }
        *user = user.with_role(new, at);
        Ok(CasOutcome::Committed(user.clone()))
    }

    async fn enroll(&self, user_id: UserId, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        Ok(users
            .entry(user_id)
            .or_insert_with(|| User::enrolled(user_id, at))
            .clone())
    }

    async fn provision(&self, user_id: UserId, role: Role, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned())?;
        let user = users
            .entry(user_id)
            .or_insert_with(|| User::enrolled(user_id, at));
        *user = user.with_role(role, at);
        Ok(user.clone())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, DirectoryError> {
        let users = self.users.read().map_err(|_| Self::poisoned())?;
        let mut out: Vec<User> = users.values().filter(|u| u.role == role).cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}
