use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use guestlist_auth::explain;

use crate::app::services::AppServices;
use crate::context::SessionContext;

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub path: String,
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<SessionContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": ctx.user_id().to_string(),
        "role": ctx.role(),
        "established_at": ctx.established_at(),
    }))
}

/// GET /api/access/explain?path=/x - why the caller would be allowed or redirected at `path`.
pub async fn explain_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Query(q): Query<ExplainQuery>,
) -> impl IntoResponse {
    Json(explain(&services.policy, Some(ctx.role()), &q.path))
}
