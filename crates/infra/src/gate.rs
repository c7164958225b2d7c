//! Request-time Route Authorization Gate.
//!
//! Combines the pure policy evaluation with a fresh role read. The directory
//! is only consulted when the governing entry restricts the path; anything
//! that stops the read from producing a role (absent user, unreachable
//! directory, timeout) ends in a denial to the sign-in page.

use std::sync::Arc;
use std::time::Duration;

use guestlist_auth::policy::normalize_path;
use guestlist_auth::{Access, Decision, RoutePolicy, Session, evaluate};

use crate::directory::UserDirectory;
use crate::sync::{SessionRoleSynchronizer, SyncError};

/// Gate verdict plus the session as it should look after the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checked {
    pub decision: Decision,
    /// The caller's session with a refreshed role hint, or `None` when the
    /// caller is anonymous or the session no longer maps to a directory user.
    pub session: Option<Session>,
    /// The incoming hint differed from the directory's role.
    pub role_changed: bool,
}

pub struct RouteGate<D> {
    policy: Arc<RoutePolicy>,
    sync: SessionRoleSynchronizer<D>,
    timeout: Duration,
}

impl<D> RouteGate<D>
where
    D: UserDirectory,
{
    pub fn new(policy: Arc<RoutePolicy>, sync: SessionRoleSynchronizer<D>, timeout: Duration) -> Self {
        Self {
            policy,
            sync,
            timeout,
        }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Decide whether `session` may reach `path`.
    ///
    /// Takes the session by value; the caller's copy is never mutated.
    pub async fn authorize(&self, session: Option<Session>, path: &str) -> Checked {
        let restricted = self
            .policy
            .lookup(normalize_path(path))
            .is_some_and(|e| e.access != Access::Public);

        let Some(mut session) = session else {
            let decision = evaluate(&self.policy, None, path);
            if let Decision::Deny { redirect_to } = &decision {
                tracing::debug!(path = %path, redirect_to = %redirect_to, "anonymous caller denied");
            }
            return Checked {
                decision,
                session: None,
                role_changed: false,
            };
        };

        if !restricted {
            return Checked {
                decision: Decision::Allow,
                session: Some(session),
                role_changed: false,
            };
        }

        let hint = session.role;
        let sign_in = self.policy.landings().sign_in.clone();

        match tokio::time::timeout(self.timeout, self.sync.fresh_role(&mut session)).await {
            Ok(Ok(role)) => {
                let decision = evaluate(&self.policy, Some(role), path);
                if let Decision::Deny { redirect_to } = &decision {
                    tracing::debug!(
                        user_id = %session.user_id,
                        role = %role,
                        path = %path,
                        redirect_to = %redirect_to,
                        "route denied"
                    );
                }
                Checked {
                    decision,
                    session: Some(session),
                    role_changed: hint != role,
                }
            }
            Ok(Err(SyncError::NotFound(user_id))) => {
                tracing::warn!(user_id = %user_id, path = %path, "session user missing from directory; denying");
                Checked {
                    decision: Decision::deny(sign_in),
                    session: None,
                    role_changed: false,
                }
            }
            Ok(Err(SyncError::Unavailable(reason))) => {
                tracing::warn!(user_id = %session.user_id, path = %path, reason = %reason, "directory unavailable; failing closed");
                Checked {
                    decision: Decision::deny(sign_in),
                    session: Some(session),
                    role_changed: false,
                }
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %session.user_id,
                    path = %path,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "role lookup timed out; failing closed"
                );
                Checked {
                    decision: Decision::deny(sign_in),
                    session: Some(session),
                    role_changed: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use crate::resync::ResyncMarks;
    use crate::testing::{DownDirectory, SlowDirectory};
    use crate::transitions::{Actor, TransitionService};
    use chrono::Utc;
    use guestlist_auth::{Landings, PolicyEntry, Role, RoleSet, RoutePattern};
    use guestlist_core::UserId;

    fn scenario_policy() -> Arc<RoutePolicy> {
        Arc::new(
            RoutePolicy::new(
                vec![
                    PolicyEntry::restricted("pending-only", RoutePattern::exact("/pending"), RoleSet::PENDING),
                    PolicyEntry::restricted("rejected-only", RoutePattern::exact("/rejected"), RoleSet::REJECTED),
                    PolicyEntry::restricted("approved-area", RoutePattern::prefix("/approved-area"), RoleSet::MEMBERS),
                    PolicyEntry::restricted("landing", RoutePattern::exact("/dashboard"), RoleSet::MEMBERS),
                ],
                Landings::default(),
            )
            .unwrap(),
        )
    }

    fn gate<D: UserDirectory>(dir: D, timeout: Duration) -> RouteGate<D> {
        RouteGate::new(
            scenario_policy(),
            SessionRoleSynchronizer::new(dir, Arc::new(ResyncMarks::new())),
            timeout,
        )
    }

    #[tokio::test]
    async fn end_to_end_approval_scenario() {
        let dir = Arc::new(InMemoryUserDirectory::new());
        let marks = Arc::new(ResyncMarks::new());
        let gate = RouteGate::new(
            scenario_policy(),
            SessionRoleSynchronizer::new(dir.clone(), marks.clone()),
            Duration::from_secs(1),
        );
        let svc = TransitionService::new(dir.clone(), marks.clone());

        // Anonymous visitor.
        let out = gate.authorize(None, "/approved-area").await;
        assert_eq!(out.decision, Decision::deny("/sign-in"));

        // U1 signs in and waits.
        let u1 = UserId::new();
        let user = dir.enroll(u1, Utc::now()).await.unwrap();
        let session = Session::new(u1, user.role, Utc::now());
        let out = gate.authorize(Some(session.clone()), "/approved-area").await;
        assert_eq!(out.decision, Decision::deny("/pending"));

        // A1 approves U1.
        let a1 = UserId::new();
        dir.provision(a1, Role::Approved, Utc::now()).await.unwrap();
        svc.promote(Actor { user_id: a1, role: Role::Approved }, u1)
            .await
            .unwrap();

        // U1's next request re-synchronizes even though the hint still says pending.
        let out = gate.authorize(Some(session.clone()), "/approved-area").await;
        assert_eq!(out.decision, Decision::Allow);
        assert!(out.role_changed);
        let refreshed = out.session.unwrap();
        assert_eq!(refreshed.role, Role::Approved);
        assert_eq!(session.role, Role::Pending, "caller's copy is untouched");

        let out = gate.authorize(Some(refreshed), "/pending").await;
        assert_eq!(out.decision, Decision::deny("/dashboard"));
        assert!(!out.role_changed);
    }

    #[tokio::test]
    async fn pending_on_own_page_is_allowed() {
        let dir = Arc::new(InMemoryUserDirectory::new());
        let id = UserId::new();
        dir.enroll(id, Utc::now()).await.unwrap();
        let gate = gate(dir, Duration::from_secs(1));

        let out = gate
            .authorize(Some(Session::new(id, Role::Pending, Utc::now())), "/pending")
            .await;
        assert_eq!(out.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn public_paths_skip_the_directory() {
        // Even a dead directory cannot block a public path.
        let gate = gate(DownDirectory, Duration::from_secs(1));
        let session = Session::new(UserId::new(), Role::Pending, Utc::now());

        let out = gate.authorize(Some(session.clone()), "/sign-in").await;
        assert_eq!(out.decision, Decision::Allow);
        assert_eq!(out.session, Some(session));
    }

    #[tokio::test]
    async fn unreachable_directory_fails_closed() {
        let gate = gate(DownDirectory, Duration::from_secs(1));
        let session = Session::new(UserId::new(), Role::Admin, Utc::now());

        let out = gate.authorize(Some(session), "/approved-area").await;
        assert_eq!(out.decision, Decision::deny("/sign-in"));
    }

    #[tokio::test]
    async fn slow_directory_fails_closed() {
        let slow = SlowDirectory {
            inner: InMemoryUserDirectory::new(),
            delay: Duration::from_millis(200),
        };
        let id = UserId::new();
        slow.inner.provision(id, Role::Approved, Utc::now()).await.unwrap();
        let gate = gate(slow, Duration::from_millis(20));

        let out = gate
            .authorize(Some(Session::new(id, Role::Approved, Utc::now())), "/approved-area")
            .await;
        assert_eq!(out.decision, Decision::deny("/sign-in"));
    }

    #[tokio::test]
    async fn vanished_user_loses_session() {
        let gate = gate(Arc::new(InMemoryUserDirectory::new()), Duration::from_secs(1));
        let out = gate
            .authorize(Some(Session::new(UserId::new(), Role::Approved, Utc::now())), "/dashboard")
            .await;
        assert_eq!(out.decision, Decision::deny("/sign-in"));
        assert!(out.session.is_none());
    }

    #[tokio::test]
    async fn repeated_checks_agree() {
        let dir = Arc::new(InMemoryUserDirectory::new());
        let id = UserId::new();
        dir.provision(id, Role::Rejected, Utc::now()).await.unwrap();
        let gate = gate(dir, Duration::from_secs(1));
        let session = Session::new(id, Role::Rejected, Utc::now());

        let a = gate.authorize(Some(session.clone()), "/approved-area").await;
        let b = gate.authorize(Some(session), "/approved-area").await;
        assert_eq!(a.decision, b.decision);
        assert_eq!(a.decision, Decision::deny("/rejected"));
    }
}
