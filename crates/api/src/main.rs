use anyhow::Context;

use guestlist_infra::{AppConfig, LogFormat};
use guestlist_observability::OutputFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    guestlist_observability::init(match config.log_format {
        LogFormat::Json => OutputFormat::Json,
        LogFormat::Pretty => OutputFormat::Pretty,
    });

    if config.uses_dev_secret() {
        tracing::warn!("SESSION_SECRET not set; using insecure dev default");
    }

    let app = guestlist_api::app::build_app(&config)
        .await
        .context("failed to wire services")?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
