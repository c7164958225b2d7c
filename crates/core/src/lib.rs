//! `guestlist-core`: identifiers shared by every other crate.
//!
//! Pure values only; no I/O and no async.

pub mod id;

pub use id::{ParseUserIdError, UserId};
