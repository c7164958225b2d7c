//! Transition Service.
//!
//! Applies `approve`/`reject` to a directory user. The read-check-write is
//! closed by the directory's compare-and-set: when two callers race on one
//! pending user, exactly one write commits and the other re-reads and lands
//! on the replay or conflict path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use guestlist_auth::{Role, Step, Transition, User};
use guestlist_core::UserId;

use crate::directory::{CasOutcome, DirectoryError, UserDirectory};
use crate::resync::ResyncMarks;

/// Roles only ever leave `PENDING` once, so one stale CAS is the worst case.
const MAX_ATTEMPTS: usize = 3;

/// The caller requesting a transition, with a role already re-read from the directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

/// Successful transition result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transitioned {
    pub user: User,
    /// `true` when the requested outcome was already in place and nothing was written.
    pub replayed: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("user {user_id} is already {current}")]
    Conflict { user_id: UserId, current: Role },

    /// Retryable: nothing was written.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The write may or may not have committed; re-read before retrying.
    #[error("transition outcome unknown: {0}")]
    OutcomeUnknown(String),
}

impl From<DirectoryError> for TransitionError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::Unavailable(msg) | DirectoryError::Corrupt(msg) => Self::Unavailable(msg),
        }
    }
}

pub struct TransitionService<D> {
    directory: D,
    marks: Arc<ResyncMarks>,
    timeout: Option<Duration>,
}

impl<D> TransitionService<D>
where
    D: UserDirectory,
{
    pub fn new(directory: D, marks: Arc<ResyncMarks>) -> Self {
        Self {
            directory,
            marks,
            timeout: None,
        }
    }

    /// Bound each call; an expired call reports [`TransitionError::OutcomeUnknown`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `PENDING → APPROVED`.
    pub async fn promote(&self, actor: Actor, target: UserId) -> Result<Transitioned, TransitionError> {
        self.run(Transition::Approve, actor, target).await
    }

    /// `PENDING → REJECTED`.
    pub async fn demote(&self, actor: Actor, target: UserId) -> Result<Transitioned, TransitionError> {
        self.run(Transition::Reject, actor, target).await
    }

    async fn run(
        &self,
        transition: Transition,
        actor: Actor,
        target: UserId,
    ) -> Result<Transitioned, TransitionError> {
        match self.timeout {
            None => self.apply(transition, actor, target).await,
            Some(limit) => match tokio::time::timeout(limit, self.apply(transition, actor, target)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        transition = %transition,
                        target = %target,
                        timeout_ms = limit.as_millis() as u64,
                        "transition timed out; outcome unknown"
                    );
                    Err(TransitionError::OutcomeUnknown(format!(
                        "{transition} of {target} did not finish within {}ms",
                        limit.as_millis()
                    )))
                }
            },
        }
    }

    #[instrument(skip_all, fields(transition = %transition, actor = %actor.user_id, target = %target))]
    async fn apply(
        &self,
        transition: Transition,
        actor: Actor,
        target: UserId,
    ) -> Result<Transitioned, TransitionError> {
        if !transition.permits(actor.role) {
            return Err(TransitionError::Forbidden(format!(
                "role '{}' may not {transition} users",
                actor.role
            )));
        }
        if actor.user_id == target {
            return Err(TransitionError::Forbidden(
                "users may not decide their own record".to_string(),
            ));
        }

        for _ in 0..MAX_ATTEMPTS {
            let user = self
                .directory
                .get(target)
                .await?
                .ok_or(TransitionError::NotFound(target))?;

            match transition.step(user.role) {
                Step::Replay => {
                    tracing::debug!(role = %user.role, "transition replayed; no write");
                    return Ok(Transitioned { user, replayed: true });
                }
                Step::Conflict { current } => {
                    return Err(TransitionError::Conflict {
                        user_id: target,
                        current,
                    });
                }
                Step::Apply { from, to } => {
                    match self
                        .directory
                        .compare_and_set_role(target, from, to, Utc::now())
                        .await?
                    {
                        CasOutcome::Committed(user) => {
                            self.marks.mark(target, user.updated_at);
                            tracing::info!(from = %from, to = %to, "role transition committed");
                            return Ok(Transitioned {
                                user,
                                replayed: false,
                            });
                        }
                        CasOutcome::NotFound => return Err(TransitionError::NotFound(target)),
                        CasOutcome::Stale => {
                            tracing::debug!("lost compare-and-set race; re-reading");
                        }
                    }
                }
            }
        }

        Err(TransitionError::Unavailable(format!(
            "role of {target} kept changing during {transition}"
        )))
    }
}
