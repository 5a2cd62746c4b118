//! services/api/src/web/middleware.rs
//!
//! Session gate middleware for page navigations and dashboard actions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use guardian_core::{GateDecision, Route, Session};
use std::sync::Arc;
use tracing::info;

use crate::web::state::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Extracts the session token from the `Cookie` header, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

/// A cookie that no longer resolves to a session takes its dashboard with it.
async fn forget_dead_session(state: &AppState, token: Option<&str>, session: Option<&Session>) {
    if let (Some(token), None) = (token, session) {
        if state.dashboards.unmount(token).await {
            info!("Dropped the dashboard of an expired session.");
        }
    }
}

/// Page-level gate: runs before any page handler and redirects browser navigations.
///
/// If the session is present it is inserted into the request extensions.
pub async fn session_gate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(route) = Route::from_path(req.uri().path()) else {
        return next.run(req).await;
    };

    let token = session_token(req.headers()).map(str::to_owned);
    let (decision, session) = state.session_gate.check(route, token.as_deref()).await;
    forget_dead_session(&state, token.as_deref(), session.as_ref()).await;

    match decision {
        GateDecision::Redirect(target) => {
            info!("Redirecting {} to {}.", route.path(), target.path());
            Redirect::to(target.path()).into_response()
        }
        GateDecision::Proceed => {
            if let Some(session) = session {
                req.extensions_mut().insert(session);
            }
            next.run(req).await
        }
    }
}

/// Action-level gate for the JSON dashboard endpoints: `401` instead of a redirect.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = session_token(req.headers()).map(str::to_owned);
    let (decision, session) = state.session_gate.check(Route::Main, token.as_deref()).await;
    forget_dead_session(&state, token.as_deref(), session.as_ref()).await;

    match (decision, session) {
        (GateDecision::Proceed, Some(session)) => {
            req.extensions_mut().insert(session);
            Ok(next.run(req).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn finds_the_session_cookie_among_others() {
        assert_eq!(session_token(&headers("theme=dark; session=abc; x=1")), Some("abc"));
        assert_eq!(session_token(&headers("session=xyz")), Some("xyz"));
    }

    #[test]
    fn ignores_missing_or_empty_session_cookies() {
        assert_eq!(session_token(&HeaderMap::new()), None);
        assert_eq!(session_token(&headers("session=")), None);
        assert_eq!(session_token(&headers("mysession=abc")), None);
    }
}
