use std::sync::Arc;

use chrono::Utc;

use guestlist_auth::{Role, RoutePolicy};
use guestlist_core::UserId;
use guestlist_infra::{
    AppConfig, DirectoryError, InMemoryUserDirectory, PostgresUserDirectory, ResyncMarks, RouteGate,
    SessionRoleSynchronizer, TransitionService, UserDirectory,
};

use crate::session_token::SessionTokens;

/// The directory every service shares, whichever backend was selected.
pub type SharedDirectory = Arc<dyn UserDirectory>;

pub struct AppServices {
    pub directory: SharedDirectory,
    pub policy: Arc<RoutePolicy>,
    pub gate: Arc<RouteGate<SharedDirectory>>,
    pub transitions: TransitionService<SharedDirectory>,
    pub tokens: Arc<SessionTokens>,
}

impl AppServices {
    pub fn new(directory: SharedDirectory, config: &AppConfig) -> Self {
        let policy = Arc::new(RoutePolicy::standard());
        let tokens = Arc::new(SessionTokens::new(
            config.session_secret.as_bytes(),
            config.session_ttl,
        ));
        let marks = Arc::new(ResyncMarks::with_retention(tokens.ttl()));

        let gate = Arc::new(RouteGate::new(
            policy.clone(),
            SessionRoleSynchronizer::new(directory.clone(), marks.clone()),
            config.directory_timeout,
        ));
        let transitions =
            TransitionService::new(directory.clone(), marks).with_timeout(config.directory_timeout);

        Self {
            directory,
            policy,
            gate,
            transitions,
            tokens,
        }
    }
}

/// Select the directory backend from config and wire the services around it.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, DirectoryError> {
    let directory: SharedDirectory = match &config.database_url {
        Some(url) => {
            let pg = PostgresUserDirectory::connect(url).await?;
            pg.migrate().await?;
            tracing::info!("using postgres user directory");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory user directory");
            Arc::new(InMemoryUserDirectory::new())
        }
    };

    bootstrap_admins(directory.as_ref(), &config.bootstrap_admins).await?;

    Ok(AppServices::new(directory, config))
}

/// Provision configured administrators out of band.
pub async fn bootstrap_admins(directory: &dyn UserDirectory, admins: &[UserId]) -> Result<(), DirectoryError> {
    for &id in admins {
        directory.provision(id, Role::Admin, Utc::now()).await?;
        tracing::info!(user_id = %id, "provisioned bootstrap admin");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_backend_with_bootstrap_admin() {
        let admin = UserId::new();
        let config = AppConfig {
            bootstrap_admins: vec![admin],
            ..AppConfig::default()
        };

        let services = build_services(&config).await.unwrap();
        assert_eq!(services.directory.get_role(admin).await.unwrap(), Some(Role::Admin));
        assert!(services.policy.lookup("/admin/users").is_some());
    }
}
