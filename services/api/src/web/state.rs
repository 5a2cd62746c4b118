//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the registry of mounted dashboards.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use guardian_core::{BiometricGate, IdentityService, RecordStore, Session, SessionEvent, SessionGate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::info;

use crate::config::Config;
use crate::web::dashboard::{Dashboard, DashboardDeps};
use crate::web::protocol::Notice;

/// How often dashboards of sessions that expired without a sign-out are dropped.
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub identity: Arc<dyn IdentityService>,
    pub store: Arc<dyn RecordStore>,
    pub gate: Arc<dyn BiometricGate>,
    pub session_gate: SessionGate,
    pub config: Arc<Config>,
    pub dashboards: DashboardRegistry,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn RecordStore>,
        gate: Arc<dyn BiometricGate>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            session_gate: SessionGate::new(identity.clone()),
            identity,
            store,
            gate,
            config,
            dashboards: DashboardRegistry::default(),
        }
    }

    fn dashboard_deps(&self) -> DashboardDeps {
        DashboardDeps {
            identity: self.identity.clone(),
            store: self.store.clone(),
            gate: self.gate.clone(),
            gate_timeout: self.config.gate_timeout,
            copy_confirmation: self.config.copy_confirmation,
        }
    }

    /// Returns the session's dashboard, mounting and loading it on first use.
    pub async fn dashboard_for(&self, session: &Session) -> (Arc<Dashboard>, Vec<Notice>) {
        let (dashboard, mounted) = self
            .dashboards
            .get_or_mount(session, || Dashboard::new(session.clone(), self.dashboard_deps()))
            .await;
        if mounted {
            info!("Mounted dashboard for user {}.", session.user_id);
        }
        let notices = dashboard.ensure_loaded().await;
        (dashboard, notices)
    }

    /// Full reload: the previous view state is discarded and a fresh one is mounted.
    pub async fn remount(&self, session: &Session) -> (Arc<Dashboard>, Vec<Notice>) {
        self.dashboards.unmount(&session.token).await;
        self.dashboard_for(session).await
    }

    /// Drops mounted dashboards whenever the identity provider reports a sign-out,
    /// and periodically drops those whose session expired silently.
    pub fn spawn_session_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let mut changes = self.identity.session_changes();
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    event = changes.next() => match event {
                        Some(SessionEvent::SignedOut { token }) => {
                            state.dashboards.unmount(&token).await;
                        }
                        Some(SessionEvent::SignedIn { user_id, .. }) => {
                            info!("User {} signed in.", user_id);
                        }
                        None => break,
                    },
                    _ = sweep.tick() => {
                        let evicted = state.dashboards.evict_expired(Utc::now()).await;
                        if evicted > 0 {
                            info!("Dropped {} dashboards of expired sessions.", evicted);
                        }
                    }
                }
            }
            info!("Session change stream ended.");
        })
    }
}

//=========================================================================================
// DashboardRegistry (One Dashboard Per Session Token)
//=========================================================================================

#[derive(Default)]
pub struct DashboardRegistry {
    dashboards: Mutex<HashMap<String, Arc<Dashboard>>>,
}

impl DashboardRegistry {
    /// Returns the existing dashboard, or inserts one built by `mount`. The flag is
    /// `true` when a new dashboard was inserted.
    pub async fn get_or_mount(
        &self,
        session: &Session,
        mount: impl FnOnce() -> Dashboard,
    ) -> (Arc<Dashboard>, bool) {
        let mut dashboards = self.dashboards.lock().await;
        if let Some(existing) = dashboards.get(&session.token) {
            return (existing.clone(), false);
        }
        let dashboard = Arc::new(mount());
        dashboards.insert(session.token.clone(), dashboard.clone());
        (dashboard, true)
    }

    /// Cancels anything the dashboard still has in flight and forgets it.
    pub async fn unmount(&self, token: &str) -> bool {
        match self.dashboards.lock().await.remove(token) {
            Some(dashboard) => {
                dashboard.unmount();
                info!("Unmounted dashboard for user {}.", dashboard.session().user_id);
                true
            }
            None => false,
        }
    }

    /// Unmounts every dashboard whose session has expired by `now`.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut dashboards = self.dashboards.lock().await;
        let before = dashboards.len();
        dashboards.retain(|_, dashboard| {
            let expired = dashboard.session().is_expired(now);
            if expired {
                dashboard.unmount();
            }
            !expired
        });
        before - dashboards.len()
    }

    pub async fn mounted_count(&self) -> usize {
        self.dashboards.lock().await.len()
    }
}
