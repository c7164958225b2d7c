//! Lifecycle roles and the transitions between them.
//!
//! The state machine is deliberately tiny:
//!
//! ```text
//!            approve
//!   PENDING ─────────▶ APPROVED
//!      │
//!      │ reject
//!      ▼
//!   REJECTED
//! ```
//!
//! `ADMIN` is only reachable through out-of-band provisioning and behaves as
//! `APPROVED` for transition outcomes. `APPROVED`, `REJECTED` and `ADMIN` are
//! terminal for the public transition API.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// The single authoritative lifecycle state of a user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pending,
    Approved,
    Rejected,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Pending, Role::Approved, Role::Rejected, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Pending => "pending",
            Role::Approved => "approved",
            Role::Rejected => "rejected",
            Role::Admin => "admin",
        }
    }

    /// Approved members, including admins.
    pub fn is_member(self) -> bool {
        matches!(self, Role::Approved | Role::Admin)
    }

    /// Whether this role has left `PENDING` for good.
    pub fn is_decided(self) -> bool {
        self != Role::Pending
    }

    fn bit(self) -> u8 {
        match self {
            Role::Pending => 1,
            Role::Approved => 1 << 1,
            Role::Rejected => 1 << 2,
            Role::Admin => 1 << 3,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Role::Pending),
            "approved" => Ok(Role::Approved),
            "rejected" => Ok(Role::Rejected),
            "admin" => Ok(Role::Admin),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RoleSet
// ─────────────────────────────────────────────────────────────────────────────

/// A small set of roles, used by route policy entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);
    pub const PENDING: RoleSet = RoleSet(1);
    pub const REJECTED: RoleSet = RoleSet(1 << 2);
    pub const MEMBERS: RoleSet = RoleSet((1 << 1) | (1 << 3));
    pub const ADMIN: RoleSet = RoleSet(1 << 3);

    pub fn of(roles: &[Role]) -> Self {
        roles.iter().fold(Self::EMPTY, |set, r| set.with(*r))
    }

    pub fn with(self, role: Role) -> Self {
        Self(self.0 | role.bit())
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl core::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.iter().map(Role::as_str).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transitions
// ─────────────────────────────────────────────────────────────────────────────

/// The only transitions the public API may request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Approve,
    Reject,
}

/// What applying a transition to a given current role amounts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// Write `to` over `from`.
    Apply { from: Role, to: Role },
    /// The requested outcome is already in place; nothing to write.
    Replay,
    /// The user was already decided the other way.
    Conflict { current: Role },
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject => "reject",
        }
    }

    /// Role written when the transition applies.
    pub fn target(self) -> Role {
        match self {
            Transition::Approve => Role::Approved,
            Transition::Reject => Role::Rejected,
        }
    }

    /// Whether an actor holding `actor` may request this transition at all.
    pub fn permits(self, actor: Role) -> bool {
        actor.is_member()
    }

    /// Decide the step for a user currently in `current`.
    ///
    /// `ADMIN` counts as an approved outcome: approving an admin is a replay,
    /// rejecting one is a conflict.
    pub fn step(self, current: Role) -> Step {
        match (self, current) {
            (_, Role::Pending) => Step::Apply {
                from: Role::Pending,
                to: self.target(),
            },
            (Transition::Approve, Role::Approved | Role::Admin) => Step::Replay,
            (Transition::Reject, Role::Rejected) => Step::Replay,
            (Transition::Approve, Role::Rejected) | (Transition::Reject, Role::Approved | Role::Admin) => {
                Step::Conflict { current }
            }
        }
    }
}

impl core::fmt::Display for Transition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
