use axum::{
    routing::{get, post},
    Router,
};

pub mod admin;
pub mod pages;
pub mod session;
pub mod system;
pub mod users;

/// Router for every page and endpoint; the gate layer is applied by `build_app`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/health", get(system::health))
        .route("/sign-in", get(pages::sign_in).post(session::sign_in))
        .route("/sign-out", post(session::sign_out))
        .route("/pending", get(pages::pending))
        .route("/rejected", get(pages::rejected))
        .route("/dashboard", get(pages::dashboard))
        .route("/events", get(pages::events))
        .route("/staff", get(pages::staff))
        .route("/tickets", get(pages::tickets))
        .nest("/api", api_router())
        .nest("/admin", admin::router())
}

fn api_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/access/explain", get(system::explain_access))
        .nest("/users", users::router())
}
