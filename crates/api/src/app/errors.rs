use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use guestlist_auth::Role;
use guestlist_core::UserId;
use guestlist_infra::{DirectoryError, TransitionError};

pub fn transition_error_to_response(err: TransitionError) -> axum::response::Response {
    match err {
        TransitionError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        TransitionError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("user {id} not found"))
        }
        TransitionError::Conflict { user_id, current } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "conflict",
                "message": format!("user {user_id} is already {current}"),
                "current_role": current,
            })),
        )
            .into_response(),
        TransitionError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg)
        }
        TransitionError::OutcomeUnknown(msg) => {
            json_error(StatusCode::GATEWAY_TIMEOUT, "outcome_unknown", msg)
        }
    }
}

pub fn directory_error_to_response(err: DirectoryError) -> axum::response::Response {
    tracing::warn!(error = %err, "directory call failed");
    json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_user_id(s: &str) -> Result<UserId, axum::response::Response> {
    s.parse::<UserId>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

pub fn parse_role(s: &str) -> Result<Role, axum::response::Response> {
    s.parse::<Role>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_role",
            "role must be one of: pending, approved, rejected, admin",
        )
    })
}
