//! Declarative route policy table.
//!
//! One table, built once at process start, decides which roles may reach
//! which paths. Every redirect target a denial can produce is checked at
//! construction so that evaluation can never send a caller to a page that
//! would deny them again.

use thiserror::Error;

use crate::{Role, RoleSet};

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

/// Path pattern for a policy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    /// Exactly this path.
    Exact(String),
    /// This path and everything below it, on segment boundaries.
    Prefix(String),
}

impl RoutePattern {
    pub fn exact(path: impl Into<String>) -> Self {
        Self::Exact(path.into())
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        Self::Prefix(path.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Prefix(p) => p,
        }
    }

    /// `path` must already be normalized.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) if p == "/" => true,
            Self::Prefix(p) => {
                path == p
                    || (path.starts_with(p.as_str()) && path.as_bytes().get(p.len()) == Some(&b'/'))
            }
        }
    }

    /// Higher is more specific: exact beats any prefix, longer prefix beats shorter.
    fn specificity(&self) -> (u8, usize) {
        match self {
            Self::Exact(p) => (1, p.len()),
            Self::Prefix(p) => (0, p.len()),
        }
    }
}

impl core::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exact(p) => f.write_str(p),
            Self::Prefix(p) if p == "/" => f.write_str("/**"),
            Self::Prefix(p) => write!(f, "{p}/**"),
        }
    }
}

/// Strip query/fragment and trailing slashes.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────────────────────────────────────

/// Who may reach the paths an entry governs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not.
    Public,
    /// Only signed-in callers holding one of these roles.
    Roles(RoleSet),
}

/// Where a denied, signed-in caller is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// The landing page of the caller's own role.
    Landing,
    /// A fixed path.
    To(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    /// Short label used in logs and decision explanations.
    pub label: String,
    pub pattern: RoutePattern,
    pub access: Access,
    pub redirect: Redirect,
}

impl PolicyEntry {
    pub fn public(label: impl Into<String>, pattern: RoutePattern) -> Self {
        Self {
            label: label.into(),
            pattern,
            access: Access::Public,
            redirect: Redirect::Landing,
        }
    }

    pub fn restricted(label: impl Into<String>, pattern: RoutePattern, allowed: RoleSet) -> Self {
        Self {
            label: label.into(),
            pattern,
            access: Access::Roles(allowed),
            redirect: Redirect::Landing,
        }
    }

    pub fn with_redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect = Redirect::To(path.into());
        self
    }

    pub fn admits(&self, role: Option<Role>) -> bool {
        match (self.access, role) {
            (Access::Public, _) => true,
            (Access::Roles(_), None) => false,
            (Access::Roles(allowed), Some(r)) => allowed.contains(r),
        }
    }
}

/// Landing page per caller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landings {
    pub sign_in: String,
    pub pending: String,
    pub rejected: String,
    pub approved: String,
}

impl Landings {
    pub fn for_role(&self, role: Option<Role>) -> &str {
        match role {
            None => &self.sign_in,
            Some(Role::Pending) => &self.pending,
            Some(Role::Rejected) => &self.rejected,
            Some(Role::Approved | Role::Admin) => &self.approved,
        }
    }
}

impl Default for Landings {
    fn default() -> Self {
        Self {
            sign_in: "/sign-in".to_string(),
            pending: "/pending".to_string(),
            rejected: "/rejected".to_string(),
            approved: "/dashboard".to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("pattern '{0}' must be an absolute path")]
    InvalidPattern(String),

    #[error("landing '{path}' for {who} is denied to {who} by entry '{entry}'")]
    LandingLoop {
        who: String,
        path: String,
        entry: String,
    },

    #[error("entry '{entry}' redirects to '{path}', which it governs itself")]
    SelfRedirect { entry: String, path: String },

    #[error("entry '{entry}' redirects {who} to '{path}', which entry '{denied_by}' denies to {who}")]
    RedirectDenied {
        who: String,
        entry: String,
        path: String,
        denied_by: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy table
// ─────────────────────────────────────────────────────────────────────────────

const CALLERS: [(&str, Option<Role>); 5] = [
    ("anonymous", None),
    ("pending", Some(Role::Pending)),
    ("rejected", Some(Role::Rejected)),
    ("approved", Some(Role::Approved)),
    ("admin", Some(Role::Admin)),
];

/// Immutable routing policy.
///
/// Lookup picks the most specific matching entry (exact over prefix, longer
/// prefix over shorter); remaining ties go to the entry declared first. A
/// path no entry matches is public.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    entries: Vec<PolicyEntry>,
    landings: Landings,
}

impl RoutePolicy {
    pub fn new(entries: Vec<PolicyEntry>, landings: Landings) -> Result<Self, PolicyError> {
        let mut entries = entries;
        for e in &mut entries {
            let raw = e.pattern.as_str();
            if !raw.starts_with('/') {
                return Err(PolicyError::InvalidPattern(raw.to_string()));
            }
            let normalized = normalize_path(raw).to_string();
            e.pattern = match &e.pattern {
                RoutePattern::Exact(_) => RoutePattern::Exact(normalized),
                RoutePattern::Prefix(_) => RoutePattern::Prefix(normalized),
            };
        }

        let policy = Self { entries, landings };
        policy.check_landings()?;
        policy.check_fixed_redirects()?;
        Ok(policy)
    }

    /// The membership site's table.
    pub fn standard() -> Self {
        let entries = vec![
            PolicyEntry::public("sign-in", RoutePattern::exact("/sign-in")),
            PolicyEntry::public("sign-out", RoutePattern::exact("/sign-out")),
            PolicyEntry::public("health", RoutePattern::exact("/health")),
            PolicyEntry::restricted("pending-only", RoutePattern::exact("/pending"), RoleSet::PENDING),
            PolicyEntry::restricted("rejected-only", RoutePattern::exact("/rejected"), RoleSet::REJECTED),
            PolicyEntry::restricted("approved-landing", RoutePattern::prefix("/dashboard"), RoleSet::MEMBERS),
            PolicyEntry::restricted("events", RoutePattern::prefix("/events"), RoleSet::MEMBERS),
            PolicyEntry::restricted("staff", RoutePattern::prefix("/staff"), RoleSet::MEMBERS),
            PolicyEntry::restricted("tickets", RoutePattern::prefix("/tickets"), RoleSet::MEMBERS),
            PolicyEntry::restricted("member-api", RoutePattern::prefix("/api"), RoleSet::MEMBERS),
            PolicyEntry::restricted("admin", RoutePattern::prefix("/admin"), RoleSet::ADMIN),
        ];

        match Self::new(entries, Landings::default()) {
            Ok(p) => p,
            Err(e) => unreachable!("standard route policy is invalid: {e}"),
        }
    }

    pub fn landings(&self) -> &Landings {
        &self.landings
    }

    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    /// Governing entry for an already-normalized path.
    pub fn lookup(&self, path: &str) -> Option<&PolicyEntry> {
        let mut best: Option<&PolicyEntry> = None;
        for e in self.entries.iter().filter(|e| e.pattern.matches(path)) {
            // Strictly greater: earlier declarations keep ties.
            if best.is_none_or(|b| e.pattern.specificity() > b.pattern.specificity()) {
                best = Some(e);
            }
        }
        best
    }

    fn check_landings(&self) -> Result<(), PolicyError> {
        for (who, role) in CALLERS {
            let path = normalize_path(self.landings.for_role(role));
            if let Some(entry) = self.lookup(path) {
                if !entry.admits(role) {
                    return Err(PolicyError::LandingLoop {
                        who: who.to_string(),
                        path: path.to_string(),
                        entry: entry.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// A fixed redirect must land every signed-in caller it denies on a path
    /// that admits them.
    fn check_fixed_redirects(&self) -> Result<(), PolicyError> {
        for e in &self.entries {
            let Redirect::To(target) = &e.redirect else {
                continue;
            };
            let target = normalize_path(target);
            let Some(governing) = self.lookup(target) else {
                continue;
            };
            if governing.label == e.label && governing.pattern == e.pattern {
                return Err(PolicyError::SelfRedirect {
                    entry: e.label.clone(),
                    path: target.to_string(),
                });
            }

            // Anonymous callers always go to sign-in, never to the fixed target.
            for (who, role) in CALLERS.into_iter().filter(|(_, r)| r.is_some()) {
                if !e.admits(role) && !governing.admits(role) {
                    return Err(PolicyError::RedirectDenied {
                        who: who.to_string(),
                        entry: e.label.clone(),
                        path: target.to_string(),
                        denied_by: governing.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::standard()
    }
}
