//! User Directory boundary.
//!
//! The directory is the single source of truth for a user's lifecycle role.
//! Every role write that can race goes through [`UserDirectory::compare_and_set_role`],
//! which must be atomic per user.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use guestlist_auth::{Role, User};
use guestlist_core::UserId;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryUserDirectory;
pub use postgres::PostgresUserDirectory;

/// Result of a compare-and-set on a user's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The role matched `expected` and was replaced; carries the new record.
    Committed(User),
    /// The role no longer matched `expected`; nothing was written.
    Stale,
    /// No such user.
    NotFound,
}

/// Directory operation error.
///
/// Both variants are infrastructure failures; "user absent" is a value
/// (`None`, [`CasOutcome::NotFound`]), not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory returned invalid data: {0}")]
    Corrupt(String),
}

/// Durable store of user records keyed by identity.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<User>, DirectoryError>;

    async fn get_role(&self, user_id: UserId) -> Result<Option<Role>, DirectoryError> {
        Ok(self.get(user_id).await?.map(|u| u.role))
    }

    /// Atomically replace `expected` with `new` and refresh `updated_at`.
    async fn compare_and_set_role(
        &self,
        user_id: UserId,
        expected: Role,
        new: Role,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, DirectoryError>;

    /// Create a `Pending` record if none exists; return the stored record either way.
    async fn enroll(&self, user_id: UserId, at: DateTime<Utc>) -> Result<User, DirectoryError>;

    /// Out-of-band provisioning: set `role` unconditionally, creating the record if needed.
    ///
    /// Never reachable from the public transition API.
    async fn provision(&self, user_id: UserId, role: Role, at: DateTime<Utc>) -> Result<User, DirectoryError>;

    /// Users currently in `role`, oldest first.
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, DirectoryError>;
}

#[async_trait]
impl<S> UserDirectory for Arc<S>
where
    S: UserDirectory + ?Sized,
{
    async fn get(&self, user_id: UserId) -> Result<Option<User>, DirectoryError> {
        (**self).get(user_id).await
    }

    async fn get_role(&self, user_id: UserId) -> Result<Option<Role>, DirectoryError> {
        (**self).get_role(user_id).await
    }

    async fn compare_and_set_role(
        &self,
        user_id: UserId,
        expected: Role,
        new: Role,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, DirectoryError> {
        (**self).compare_and_set_role(user_id, expected, new, at).await
    }

    async fn enroll(&self, user_id: UserId, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        (**self).enroll(user_id, at).await
    }

    async fn provision(&self, user_id: UserId, role: Role, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        (**self).provision(user_id, role, at).await
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, DirectoryError> {
        (**self).list_by_role(role).await
    }
}
