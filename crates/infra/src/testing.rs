//! Directory doubles for failure-path tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use guestlist_auth::{Role, User};
use guestlist_core::UserId;

use crate::directory::{CasOutcome, DirectoryError, InMemoryUserDirectory, UserDirectory};

fn refused() -> DirectoryError {
    DirectoryError::Unavailable("connection refused".to_string())
}

/// A directory whose backend is unreachable.
pub struct DownDirectory;

#[async_trait]
impl UserDirectory for DownDirectory {
    async fn get(&self, _user_id: UserId) -> Result<Option<User>, DirectoryError> {
        Err(refused())
    }

    async fn compare_and_set_role(
        &self,
        _user_id: UserId,
        _expected: Role,
        _new: Role,
        _at: DateTime<Utc>,
    ) -> Result<CasOutcome, DirectoryError> {
        Err(refused())
    }

    async fn enroll(&self, _user_id: UserId, _at: DateTime<Utc>) -> Result<User, DirectoryError> {
        Err(refused())
    }

    async fn provision(&self, _user_id: UserId, _role: Role, _at: DateTime<Utc>) -> Result<User, DirectoryError> {
        Err(refused())
    }

    async fn list_by_role(&self, _role: Role) -> Result<Vec<User>, DirectoryError> {
        Err(refused())
    }
}

/// An in-memory directory that sleeps before every call.
pub struct SlowDirectory {
    pub inner: InMemoryUserDirectory,
    pub delay: Duration,
}

#[async_trait]
impl UserDirectory for SlowDirectory {
    async fn get(&self, user_id: UserId) -> Result<Option<User>, DirectoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(user_id).await
    }

    async fn compare_and_set_role(
        &self,
        user_id: UserId,
        expected: Role,
        new: Role,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, DirectoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.compare_and_set_role(user_id, expected, new, at).await
    }

    async fn enroll(&self, user_id: UserId, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        self.inner.enroll(user_id, at).await
    }

    async fn provision(&self, user_id: UserId, role: Role, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        self.inner.provision(user_id, role, at).await
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, DirectoryError> {
        self.inner.list_by_role(role).await
    }
}
