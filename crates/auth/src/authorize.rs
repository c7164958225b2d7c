//! Route authorization decisions.
//!
//! - No IO
//! - No panics
//! - No mutation: the same `(policy, role, path)` always yields the same decision

use serde::Serialize;

use crate::policy::{Access, PolicyEntry, Redirect, RoutePolicy, normalize_path};
use crate::Role;

/// Outcome of a gate check. A denial is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny { redirect_to: String },
}

impl Decision {
    pub fn deny(redirect_to: impl Into<String>) -> Self {
        Self::Deny {
            redirect_to: redirect_to.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn redirect_to(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { redirect_to } => Some(redirect_to),
        }
    }
}

/// Decide whether a caller in `role` (`None` = anonymous) may reach `path`.
///
/// `role` must already be fresh; this function trusts it.
pub fn evaluate(policy: &RoutePolicy, role: Option<Role>, path: &str) -> Decision {
    let path = normalize_path(path);
    match policy.lookup(path) {
        None => Decision::Allow,
        Some(entry) => decide(policy, entry, role, path),
    }
}

fn decide(policy: &RoutePolicy, entry: &PolicyEntry, role: Option<Role>, path: &str) -> Decision {
    if entry.admits(role) {
        return Decision::Allow;
    }

    let landings = policy.landings();
    let target = match (role, &entry.redirect) {
        (None, _) => landings.sign_in.as_str(),
        (Some(_), Redirect::To(fixed)) => fixed.as_str(),
        (Some(r), Redirect::Landing) => landings.for_role(Some(r)),
    };

    // Table validation rules this out; keep the guard so a denial can never loop.
    if normalize_path(target) == path {
        return Decision::deny(landings.sign_in.clone());
    }

    Decision::deny(target)
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a path was allowed or denied for a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    /// The normalized path that was evaluated.
    pub path: String,

    /// Caller role; `None` for anonymous callers.
    pub role: Option<Role>,

    /// Label of the governing entry, if any.
    pub matched_entry: Option<String>,

    /// Roles the governing entry admits (`None` when public).
    pub allowed_roles: Option<Vec<Role>>,

    pub decision: Decision,

    /// Human-readable reason for the decision.
    pub reason: String,
}

/// Explain the decision [`evaluate`] makes for the same inputs.
pub fn explain(policy: &RoutePolicy, role: Option<Role>, path: &str) -> Explanation {
    let normalized = normalize_path(path);
    let decision = evaluate(policy, role, path);
    let entry = policy.lookup(normalized);
    let who = role.map(Role::as_str).unwrap_or("anonymous");

    let (matched_entry, allowed_roles, reason) = match entry {
        None => (None, None, "no policy entry governs this path; it is public".to_string()),
        Some(e) => {
            let allowed = match e.access {
                Access::Public => None,
                Access::Roles(set) => Some(set.iter().collect::<Vec<_>>()),
            };
            let reason = match (&decision, e.access) {
                (Decision::Allow, Access::Public) => format!("entry '{}' is public", e.label),
                (Decision::Allow, Access::Roles(set)) => {
                    format!("entry '{}' admits {} (allowed: {})", e.label, who, set)
                }
                (Decision::Deny { redirect_to }, Access::Roles(set)) => format!(
                    "entry '{}' does not admit {} (allowed: {}); redirecting to {}",
                    e.label, who, set, redirect_to
                ),
                (Decision::Deny { redirect_to }, Access::Public) => {
                    format!("entry '{}' is public but evaluation redirected to {}", e.label, redirect_to)
                }
            };
            (Some(e.label.clone()), allowed, reason)
        }
    };

    Explanation {
        path: normalized.to_string(),
        role,
        matched_entry,
        allowed_roles,
        decision,
        reason,
    }
}
