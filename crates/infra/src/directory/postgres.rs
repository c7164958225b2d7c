//! Postgres-backed user directory.
//!
//! ## Error Mapping
//!
//! | SQLx Error | DirectoryError | Scenario |
//! |------------|----------------|----------|
//! | Database (any code) | `Corrupt` | constraint violation, bad data |
//! | PoolTimedOut / PoolClosed / Io / Tls / Protocol / other | `Unavailable` | database unreachable |
//!
//! A `role` column value outside the four lifecycle roles is reported as
//! `Corrupt` (the table's CHECK constraint should make that impossible).
//!
//! ## Atomicity
//!
//! The compare-and-set is a single `UPDATE ... WHERE id = $1 AND role = $2`.
//! Postgres row locking serializes concurrent updates to the same user; the
//! loser re-evaluates the `WHERE` clause against the committed row and
//! updates nothing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;

use guestlist_auth::{Role, User};
use guestlist_core::UserId;

use super::{CasOutcome, DirectoryError, UserDirectory};

const SCHEMA: &str = include_str!("../../migrations/0001_users.sql");

#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: Arc<PgPool>,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, DirectoryError> {
        let pool = PgPool::connect(database_url).await.map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), DirectoryError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn map_sqlx_error(err: sqlx::Error) -> DirectoryError {
    match err {
        sqlx::Error::Database(db) => DirectoryError::Corrupt(db.message().to_string()),
        other => DirectoryError::Unavailable(other.to_string()),
    }
}

fn user_from_row(row: &PgRow) -> Result<User, DirectoryError> {
    let id: uuid::Uuid = row.try_get("id").map_err(map_sqlx_error)?;
    let role: String = row.try_get("role").map_err(map_sqlx_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(map_sqlx_error)?;

    let role: Role = role
        .parse()
        .map_err(|e: guestlist_auth::RoleParseError| DirectoryError::Corrupt(e.to_string()))?;

    Ok(User {
        id: UserId::from_uuid(id),
        role,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn get(&self, user_id: UserId) -> Result<Option<User>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip_all, fields(user_id = %user_id, expected = %expected, new = %new))]
    async fn compare_and_set_role(
        &self,
        user_id: UserId,
        expected: Role,
        new: Role,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, DirectoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET role = $3,
                updated_at = GREATEST(updated_at, $4)
            WHERE id = $1 AND role = $2
            RETURNING id, role, created_at, updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = updated {
            return Ok(CasOutcome::Committed(user_from_row(&row)?));
        }

        // Nothing updated: either the user is gone or the role moved on.
        let exists = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(match exists {
            Some(_) => CasOutcome::Stale,
            None => CasOutcome::NotFound,
        })
    }

    #[instrument(skip_all, fields(user_id = %user_id))]
    async fn enroll(&self, user_id: UserId, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, role, created_at, updated_at)
            VALUES ($1, 'pending', $2, $2)
            ON CONFLICT (id) DO UPDATE SET id = users.id
            RETURNING id, role, created_at, updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(at)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        user_from_row(&row)
    }

    #[instrument(skip_all, fields(user_id = %user_id, role = %role))]
    async fn provision(&self, user_id: UserId, role: Role, at: DateTime<Utc>) -> Result<User, DirectoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, role, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (id) DO UPDATE SET
                role = EXCLUDED.role,
                updated_at = GREATEST(users.updated_at, EXCLUDED.updated_at)
            RETURNING id, role, created_at, updated_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .bind(at)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        user_from_row(&row)
    }

    #[instrument(skip_all, fields(role = %role))]
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, DirectoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, role, created_at, updated_at
            FROM users
            WHERE role = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(user_from_row).collect()
    }
}
