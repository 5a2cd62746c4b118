//! crates/guardian_core/src/session_gate.rs
//!
//! The one place that decides whether a navigation may proceed or must be redirected.
//!
//! Both the routing middleware (before any page code runs) and the dashboard's own
//! mount go through `SessionGate`, so the two checks can never disagree.

use std::sync::Arc;
use tracing::warn;

use crate::domain::Session;
use crate::ports::IdentityService;

/// The three reachable views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Transient; never a terminal destination.
    Root,
    Login,
    /// The dashboard, including everything under it.
    Main,
}

impl Route {
    pub const ROOT_PATH: &'static str = "/";
    pub const LOGIN_PATH: &'static str = "/auth";
    pub const MAIN_PATH: &'static str = "/dashboard";

    /// Maps a request path to a gated route. Paths outside the three views are not gated.
    pub fn from_path(path: &str) -> Option<Route> {
        match path {
            Self::ROOT_PATH => Some(Route::Root),
            Self::LOGIN_PATH => Some(Route::Login),
            p if p == Self::MAIN_PATH || p.starts_with("/dashboard/") => Some(Route::Main),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Root => Self::ROOT_PATH,
            Route::Login => Self::LOGIN_PATH,
            Route::Main => Self::MAIN_PATH,
        }
    }

    pub fn requires_session(self) -> bool {
        matches!(self, Route::Main)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Redirect(Route),
}

/// Pure routing policy.
pub fn decide(route: Route, authenticated: bool) -> GateDecision {
    match route {
        Route::Root => GateDecision::Redirect(Route::Login),
        Route::Main if !authenticated => GateDecision::Redirect(Route::Login),
        Route::Login if authenticated => GateDecision::Redirect(Route::Main),
        _ => GateDecision::Proceed,
    }
}

/// Resolves sessions through the identity provider and applies `decide`.
#[derive(Clone)]
pub struct SessionGate {
    identity: Arc<dyn IdentityService>,
}

impl SessionGate {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }

    /// Looks up the current session. A failed lookup counts as "no session".
    pub async fn current_session(&self, token: Option<&str>) -> Option<Session> {
        let token = token?;
        match self.identity.get_session(token).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Session lookup failed, treating as signed out: {}", e);
                None
            }
        }
    }

    pub async fn check(&self, route: Route, token: Option<&str>) -> (GateDecision, Option<Session>) {
        let session = self.current_session(token).await;
        (decide(route, session.is_some()), session)
    }
}
