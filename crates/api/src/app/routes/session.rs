use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use guestlist_auth::Session;

use crate::app::{errors, services::AppServices};
use crate::middleware::{append_cookie, clear_session_cookie, extract_bearer, session_cookie};

/// POST /sign-in - exchange a verified identity assertion for a session.
///
/// First sign-in enrolls the user as `pending`. The response redirects to the
/// landing page for the stored role and also carries the token in the body
/// for clients that prefer the `Authorization` header over cookies.
pub async fn sign_in(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    let now = Utc::now();

    let Some(assertion) = extract_bearer(&headers) else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "identity assertion required",
        );
    };

    let user_id = match services.tokens.verify_identity(assertion, now) {
        Ok(id) => id,
        Err(e) => {
            tracing::info!(error = %e, "rejected identity assertion");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string());
        }
    };

    let user = match services.directory.enroll(user_id, now).await {
        Ok(user) => user,
        Err(e) => return errors::directory_error_to_response(e),
    };

    let session = Session::new(user.id, user.role, now);
    let token = match services.tokens.issue(&session) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, user_id = %user.id, "failed to issue session token");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not issue session");
        }
    };

    let landing = services.policy.landings().for_role(Some(user.role)).to_string();
    tracing::info!(user_id = %user.id, role = %user.role, "signed in");

    let mut response = (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, landing.clone())],
        Json(json!({
            "user_id": user.id.to_string(),
            "role": user.role,
            "token": token,
            "landing": landing,
        })),
    )
        .into_response();
    append_cookie(
        response.headers_mut(),
        session_cookie(&token, services.tokens.ttl().num_seconds()),
    );
    response
}

/// POST /sign-out - drop the session cookie.
pub async fn sign_out(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let sign_in = services.policy.landings().sign_in.clone();
    let mut response = (StatusCode::SEE_OTHER, [(header::LOCATION, sign_in)]).into_response();
    append_cookie(response.headers_mut(), clear_session_cookie());
    response
}
