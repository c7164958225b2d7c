//! Admin-only review queue.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use guestlist_auth::Role;

use crate::app::{errors, services::AppServices};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
}

pub fn router() -> Router {
    Router::new().route("/users", get(list_users))
}

/// GET /admin/users?role=pending - users in one role, oldest first (defaults to `pending`).
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<ListUsersQuery>,
) -> Response {
    let role = match q.role.as_deref() {
        None => Role::Pending,
        Some(s) => match errors::parse_role(s) {
            Ok(role) => role,
            Err(resp) => return resp,
        },
    };

    match services.directory.list_by_role(role).await {
        Ok(users) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "role": role,
                "count": users.len(),
                "users": users,
            })),
        )
            .into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}
