use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use guestlist_auth::Decision;
use guestlist_infra::RouteGate;

use crate::app::services::SharedDirectory;
use crate::context::SessionContext;
use crate::session_token::SessionTokens;

pub const SESSION_COOKIE: &str = "guestlist_session";

#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<RouteGate<SharedDirectory>>,
    pub tokens: Arc<SessionTokens>,
}

/// Runs every request through the route gate.
///
/// A missing or unverifiable token is treated as an anonymous caller, so the
/// policy decides what happens next (public routes still work). Denials turn
/// into a `303 See Other` to the gate's redirect target.
pub async fn gate_middleware(
    State(state): State<GateState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let now = Utc::now();
    let token = extract_token(req.headers()).map(str::to_owned);
    let session = token.as_deref().and_then(|t| match state.tokens.verify(t, now) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unusable session token");
            None
        }
    });

    let path = req.uri().path().to_owned();
    let checked = state.gate.authorize(session, &path).await;
    let session_lost = token.is_some() && checked.session.is_none();

    let mut response = match &checked.decision {
        Decision::Deny { redirect_to } => Redirect::to(redirect_to).into_response(),
        Decision::Allow => {
            if let Some(session) = &checked.session {
                req.extensions_mut().insert(SessionContext::new(session.clone()));
            }
            next.run(req).await
        }
    };

    // Handlers that manage the cookie themselves (sign-in, sign-out) win.
    if sets_session_cookie(response.headers()) {
        return response;
    }

    if session_lost {
        append_cookie(response.headers_mut(), clear_session_cookie());
    } else if checked.role_changed {
        if let Some(session) = &checked.session {
            match state.tokens.issue(session) {
                Ok(token) => {
                    let max_age = state.tokens.ttl().num_seconds();
                    append_cookie(response.headers_mut(), session_cookie(&token, max_age));
                }
                Err(e) => tracing::warn!(error = %e, user_id = %session.user_id, "failed to re-issue session token"),
            }
        }
    }

    response
}

pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn append_cookie(headers: &mut HeaderMap, cookie: String) {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "session cookie is not a valid header value"),
    }
}

fn sets_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(SESSION_COOKIE) && v[SESSION_COOKIE.len()..].starts_with('='))
}

/// Bearer header first, then the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = extract_bearer(headers) {
        return Some(token);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn token_from_cookie() {
        let h = headers(&[(header::COOKIE, "theme=dark; guestlist_session=abc.def.ghi")]);
        assert_eq!(extract_token(&h), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_takes_precedence() {
        let h = headers(&[
            (header::COOKIE, "guestlist_session=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(extract_token(&h), Some("from-header"));
    }

    #[test]
    fn empty_values_are_absent() {
        let h = headers(&[
            (header::COOKIE, "guestlist_session="),
            (header::AUTHORIZATION, "Bearer   "),
        ]);
        assert_eq!(extract_token(&h), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn recognizes_session_cookie_only() {
        let h = headers(&[(header::SET_COOKIE, "guestlist_session_other=1")]);
        assert!(!sets_session_cookie(&h));
        let h = headers(&[(header::SET_COOKIE, clear_session_cookie().as_str())]);
        assert!(sets_session_cookie(&h));
    }
}
