//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: directory selection, gate and transition service wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use guestlist_infra::AppConfig;

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(Arc::new(services)))
}

/// Router over already-wired services. Every route sits behind the gate.
pub fn router(services: Arc<AppServices>) -> Router {
    let gate_state = middleware::GateState {
        gate: services.gate.clone(),
        tokens: services.tokens.clone(),
    };

    routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            gate_state,
            middleware::gate_middleware,
        ))
        .layer(ServiceBuilder::new())
}
