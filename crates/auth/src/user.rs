//! Directory user record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guestlist_core::UserId;

use crate::Role;

/// One directory entry.
///
/// # Invariants
/// - `role` is always one of the four lifecycle roles; a fresh record is `Pending`.
/// - `id` and `created_at` never change after enrollment.
/// - `updated_at` moves forward on every committed role change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A newly enrolled user, waiting for review.
    pub fn enrolled(id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            role: Role::Pending,
            created_at: at,
            updated_at: at,
        }
    }

    /// Copy of this record with `role` written at `at`.
    pub fn with_role(&self, role: Role, at: DateTime<Utc>) -> Self {
        Self {
            role,
            updated_at: at.max(self.updated_at),
            ..self.clone()
        }
    }
}
