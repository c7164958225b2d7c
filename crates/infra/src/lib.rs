//! Infrastructure layer: user directory, transitions, session sync, config.

pub mod config;
pub mod directory;
pub mod gate;
pub mod resync;
pub mod sync;
pub mod transitions;

pub use config::{AppConfig, ConfigError, LogFormat};
pub use directory::{CasOutcome, DirectoryError, InMemoryUserDirectory, PostgresUserDirectory, UserDirectory};
pub use gate::{Checked, RouteGate};
pub use resync::ResyncMarks;
pub use sync::{SessionRoleSynchronizer, SyncError};
pub use transitions::{Actor, TransitionError, TransitionService, Transitioned};

#[cfg(test)]
pub(crate) mod testing;
