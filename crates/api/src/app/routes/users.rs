//! Lifecycle transitions on other users.
//!
//! The gate has already re-read the caller's role by the time a handler
//! runs, so the actor handed to the transition service is never a stale hint.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use guestlist_auth::Transition;
use guestlist_infra::Actor;

use crate::app::{errors, services::AppServices};
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/:id/promote", post(promote))
        .route("/:id/demote", post(demote))
}

/// POST /api/users/:id/promote
pub async fn promote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    transition(&services, &ctx, &id, Transition::Approve).await
}

/// POST /api/users/:id/demote
pub async fn demote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Response {
    transition(&services, &ctx, &id, Transition::Reject).await
}

async fn transition(services: &AppServices, ctx: &SessionContext, id: &str, transition: Transition) -> Response {
    let target = match errors::parse_user_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let actor = Actor {
        user_id: ctx.user_id(),
        role: ctx.role(),
    };

    let result = match transition {
        Transition::Approve => services.transitions.promote(actor, target).await,
        Transition::Reject => services.transitions.demote(actor, target).await,
    };

    match result {
        Ok(done) => (StatusCode::OK, Json(done)).into_response(),
        Err(e) => errors::transition_error_to_response(e),
    }
}
