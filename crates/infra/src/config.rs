//! Configuration loading and representation.
//!
//! All settings come from environment variables. Parsing is separated from
//! the environment itself (`from_lookup`) so it can be tested without
//! touching process state.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use guestlist_core::UserId;

const DEV_SESSION_SECRET: &str = "dev-session-secret";

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },
}

impl ConfigError {
    fn invalid(var: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub session_secret: String,
    pub session_ttl: Duration,
    /// `None` selects the in-memory directory.
    pub database_url: Option<String>,
    /// Upper bound on the role lookup inside one authorization check.
    pub directory_timeout: Duration,
    /// Users provisioned as `ADMIN` at startup.
    pub bootstrap_admins: Vec<UserId>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_ttl: Duration::from_secs(720 * 60),
            database_url: None,
            directory_timeout: Duration::from_millis(2000),
            bootstrap_admins: Vec::new(),
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("GUESTLIST_BIND") {
            cfg.bind = v
                .parse()
                .map_err(|e| ConfigError::invalid("GUESTLIST_BIND", format!("{e}")))?;
        }

        if let Some(v) = get("SESSION_SECRET") {
            cfg.session_secret = v;
        }

        if let Some(v) = get("SESSION_TTL_MINUTES") {
            let minutes: u64 = v
                .parse()
                .map_err(|e| ConfigError::invalid("SESSION_TTL_MINUTES", format!("{e}")))?;
            if minutes == 0 {
                return Err(ConfigError::invalid("SESSION_TTL_MINUTES", "must be positive"));
            }
            cfg.session_ttl = minutes
                .checked_mul(60)
                .map(Duration::from_secs)
                .filter(|ttl| *ttl <= MAX_SESSION_TTL)
                .ok_or_else(|| ConfigError::invalid("SESSION_TTL_MINUTES", "too large (max one year)"))?;
        }

        cfg.database_url = get("DATABASE_URL");

        if let Some(v) = get("DIRECTORY_TIMEOUT_MS") {
            let ms: u64 = v
                .parse()
                .map_err(|e| ConfigError::invalid("DIRECTORY_TIMEOUT_MS", format!("{e}")))?;
            if ms == 0 {
                return Err(ConfigError::invalid("DIRECTORY_TIMEOUT_MS", "must be positive"));
            }
            cfg.directory_timeout = Duration::from_millis(ms);
        }

        if let Some(v) = get("BOOTSTRAP_ADMINS") {
            cfg.bootstrap_admins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<UserId>()
                        .map_err(|e| ConfigError::invalid("BOOTSTRAP_ADMINS", e.to_string()))
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(v) = get("LOG_FORMAT") {
            cfg.log_format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(ConfigError::invalid(
                        "LOG_FORMAT",
                        format!("expected 'json' or 'pretty', got '{other}'"),
                    ));
                }
            };
        }

        Ok(cfg)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_empty() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.bind.port(), 8080);
        assert!(cfg.uses_dev_secret());
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.directory_timeout, Duration::from_millis(2000));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn parses_all_values() {
        let admin = UserId::new();
        let admins = format!(" {admin} ,");
        let cfg = from_pairs(&[
            ("GUESTLIST_BIND", "127.0.0.1:9000"),
            ("SESSION_SECRET", "s3cret"),
            ("SESSION_TTL_MINUTES", "30"),
            ("DATABASE_URL", "postgres://localhost/guestlist"),
            ("DIRECTORY_TIMEOUT_MS", "250"),
            ("BOOTSTRAP_ADMINS", admins.as_str()),
            ("LOG_FORMAT", "Pretty"),
        ])
        .unwrap();

        assert_eq!(cfg.bind.port(), 9000);
        assert!(!cfg.uses_dev_secret());
        assert_eq!(cfg.session_ttl, Duration::from_secs(1800));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/guestlist"));
        assert_eq!(cfg.directory_timeout, Duration::from_millis(250));
        assert_eq!(cfg.bootstrap_admins, vec![admin]);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let cfg = from_pairs(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            from_pairs(&[("DIRECTORY_TIMEOUT_MS", "0")]),
            Err(ConfigError::Invalid { var: "DIRECTORY_TIMEOUT_MS", .. })
        ));
        assert!(matches!(
            from_pairs(&[("BOOTSTRAP_ADMINS", "not-a-uuid")]),
            Err(ConfigError::Invalid { var: "BOOTSTRAP_ADMINS", .. })
        ));
        assert!(matches!(
            from_pairs(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { var: "LOG_FORMAT", .. })
        ));
        assert!(matches!(
            from_pairs(&[("SESSION_TTL_MINUTES", "307445734561825861")]),
            Err(ConfigError::Invalid { var: "SESSION_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            from_pairs(&[("SESSION_TTL_MINUTES", "525601")]),
            Err(ConfigError::Invalid { var: "SESSION_TTL_MINUTES", .. })
        ));
        assert!(from_pairs(&[("SESSION_TTL_MINUTES", "525600")]).is_ok());
        assert!(matches!(
            from_pairs(&[("GUESTLIST_BIND", "nope")]),
            Err(ConfigError::Invalid { var: "GUESTLIST_BIND", .. })
        ));
    }
}
