//! `guestlist-auth`: the pure access-control boundary.
//!
//! Lifecycle roles, the transition rules between them, sessions, and the
//! route policy evaluation. Nothing here touches HTTP or storage, and nothing
//! suspends.

pub mod authorize;
pub mod claims;
pub mod policy;
pub mod roles;
pub mod user;

pub use authorize::{Decision, Explanation, evaluate, explain};
pub use claims::{ClaimsError, Session, SessionClaims, validate_claims, validate_window};
pub use policy::{Access, Landings, PolicyEntry, PolicyError, Redirect, RoutePattern, RoutePolicy};
pub use roles::{Role, RoleParseError, RoleSet, Step, Transition};
pub use user::User;
