//! services/api/src/web/dashboard.rs
//!
//! The per-session dashboard controller. Each public method is one user action and
//! runs its steps strictly in order: gate, mutate, reload.
//!
//! The view state sits behind an async mutex that is never held across a gate or a
//! store call, so a slow action never blocks the others. Whatever an action learns
//! after awaiting is re-checked against the current state before it is applied.

use chrono::Utc;
use guardian_core::{
    generate_secret, run_gate, BiometricGate, IdentityService, NewDiaryEntry, NewSecret, Panel,
    PortError, RecordStore, Session, User, VaultViewState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{DashboardError, DashboardResult};
use crate::web::protocol::{ActionResponse, DashboardView, Notice};

/// Shown while the gate is running.
const AUTHENTICATING: &str = "Authenticating...";

/// Everything a dashboard needs from the outside world.
#[derive(Clone)]
pub struct DashboardDeps {
    pub identity: Arc<dyn IdentityService>,
    pub store: Arc<dyn RecordStore>,
    pub gate: Arc<dyn BiometricGate>,
    pub gate_timeout: Duration,
    pub copy_confirmation: Duration,
}

pub struct Dashboard {
    session: Session,
    deps: DashboardDeps,
    state: Arc<Mutex<VaultViewState>>,
    /// Fired on unmount; aborts any gate still in progress.
    cancel: CancellationToken,
    /// Set once the first load has finished.
    loaded: OnceCell<()>,
}

impl Dashboard {
    /// Fresh, default view state. Call `load` before first use.
    pub fn new(session: Session, deps: DashboardDeps) -> Self {
        Self {
            session,
            deps,
            state: Arc::new(Mutex::new(VaultViewState::new(Utc::now().date_naive()))),
            cancel: CancellationToken::new(),
            loaded: OnceCell::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Loads both collections, as on first render.
    pub async fn load(&self) -> Vec<Notice> {
        let mut notices = Vec::new();
        notices.extend(self.reload_secrets().await);
        notices.extend(self.reload_diary().await);
        notices
    }

    /// Runs the first load exactly once. Concurrent callers wait for it to finish;
    /// only the caller that ran it receives its notices.
    pub async fn ensure_loaded(&self) -> Vec<Notice> {
        let mut notices = Vec::new();
        let first = &mut notices;
        self.loaded
            .get_or_init(|| async move {
                *first = self.load().await;
            })
            .await;
        notices
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub async fn view(&self) -> DashboardView {
        DashboardView::from(&*self.state.lock().await)
    }

    pub async fn respond(&self, notices: Vec<Notice>) -> ActionResponse {
        ActionResponse {
            view: self.view().await,
            notices,
        }
    }

    /// Direct read access for callers that need more than the rendered view.
    pub async fn with_state<T>(&self, f: impl FnOnce(&VaultViewState) -> T) -> T {
        f(&*self.state.lock().await)
    }

    //=====================================================================================
    // Shared Steps
    //=====================================================================================

    async fn authenticate(&self, notices: &mut Vec<Notice>) -> DashboardResult<()> {
        notices.push(Notice::info(AUTHENTICATING));
        let outcome = run_gate(
            self.deps.gate.as_ref(),
            self.deps.gate_timeout,
            &self.cancel,
        )
        .await;
        match DashboardError::from_gate(outcome) {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    async fn current_user(&self) -> DashboardResult<User> {
        self.deps
            .identity
            .get_user(&self.session.token)
            .await
            .map_err(|e| DashboardError::store("Loading the current user", e))?
            .ok_or(DashboardError::Unauthorized)
    }

    async fn reload_secrets(&self) -> Option<Notice> {
        let seq = self.state.lock().await.begin_secrets_load();
        match self.deps.store.list_secrets(self.session.user_id).await {
            Ok(secrets) => {
                if !self.state.lock().await.apply_secrets(seq, secrets) {
                    info!("Discarding superseded secrets load {}.", seq);
                }
                None
            }
            Err(e) => {
                error!("Failed to load secrets: {:?}", e);
                Some(Notice::error("Could not load your secrets"))
            }
        }
    }

    async fn reload_diary(&self) -> Option<Notice> {
        let seq = self.state.lock().await.begin_diary_load();
        match self.deps.store.list_diary_entries(self.session.user_id).await {
            Ok(entries) => {
                if !self.state.lock().await.apply_diary_entries(seq, entries) {
                    info!("Discarding superseded diary load {}.", seq);
                }
                None
            }
            Err(e) => {
                error!("Failed to load diary entries: {:?}", e);
                Some(Notice::error("Could not load your diary"))
            }
        }
    }

    async fn insert_secret(&self, draft: NewSecret) -> DashboardResult<()> {
        let user = self.current_user().await?;
        let secret = NewSecret {
            owner_id: user.user_id,
            ..draft
        };
        self.deps
            .store
            .insert_secret(secret)
            .await
            .map_err(|e| DashboardError::store("Saving the secret", e))?;
        Ok(())
    }

    //=====================================================================================
    // Panels
    //=====================================================================================

    /// Switches panel. The diary is unlocked through the gate the first time only.
    pub async fn select_panel(&self, panel: Panel) -> DashboardResult<Vec<Notice>> {
        let needs_gate = self.state.lock().await.select_panel(panel);
        let mut notices = Vec::new();
        if needs_gate {
            self.authenticate(&mut notices).await?;
            self.state.lock().await.unlock_diary();
            notices.push(Notice::success("Diary unlocked!"));
        }
        Ok(notices)
    }

    //=====================================================================================
    // Vault and Drawer
    //=====================================================================================

    pub async fn open_vault(&self) -> DashboardResult<Vec<Notice>> {
        let mut notices = Vec::new();
        self.authenticate(&mut notices).await?;
        self.state.lock().await.open_vault();
        notices.push(Notice::success("Vault unlocked!"));
        Ok(notices)
    }

    pub async fn close_vault(&self) {
        self.state.lock().await.close_vault();
    }

    /// Opens the drawer on a listed secret. The secret is looked up again once the
    /// gate has passed, so a delete that lands meanwhile wins.
    pub async fn open_secret(&self, id: Uuid) -> DashboardResult<Vec<Notice>> {
        {
            let state = self.state.lock().await;
            if !state.vault_open() {
                return Err(DashboardError::VaultClosed);
            }
            if state.find_secret(id).is_none() {
                return Err(DashboardError::UnknownSecret(id));
            }
        }

        let mut notices = Vec::new();
        self.authenticate(&mut notices).await?;
        if self.state.lock().await.open_drawer(id) {
            notices.push(Notice::success("Drawer open!"));
        } else {
            info!("Vault closed or secret {} removed while the gate was running; drawer not opened.", id);
        }
        Ok(notices)
    }

    pub async fn close_drawer(&self) {
        self.state.lock().await.close_drawer();
    }

    /// Returns the new reveal flag.
    pub async fn toggle_reveal(&self) -> DashboardResult<bool> {
        self.state
            .lock()
            .await
            .toggle_reveal()
            .ok_or(DashboardError::NoSecretSelected)
    }

    /// Returns the plaintext for the clipboard. The "copied" confirmation clears itself
    /// after the configured delay.
    pub async fn copy_value(&self) -> DashboardResult<(String, Vec<Notice>)> {
        let (ticket, value) = self
            .state
            .lock()
            .await
            .mark_copied()
            .ok_or(DashboardError::NoSecretSelected)?;

        let state = Arc::clone(&self.state);
        let delay = self.deps.copy_confirmation;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.lock().await.clear_copied(ticket);
        });

        Ok((value, vec![Notice::success("Secret copied!")]))
    }

    /// Deletes a secret. A secret that is already gone counts as deleted.
    pub async fn delete_secret(&self, id: Uuid) -> DashboardResult<Vec<Notice>> {
        match self.deps.store.delete_secret(self.session.user_id, id).await {
            Ok(()) => info!("Deleted secret {}.", id),
            Err(PortError::NotFound(_)) => warn!("Secret {} was already deleted.", id),
            Err(e) => {
                error!("Failed to delete secret {}: {:?}", id, e);
                return Err(DashboardError::store("Deleting the secret", e));
            }
        }

        self.state.lock().await.secret_deleted(id);
        let mut notices = vec![Notice::success("Secret deleted")];
        notices.extend(self.reload_secrets().await);
        Ok(notices)
    }

    //=====================================================================================
    // Create Panel
    //=====================================================================================

    pub async fn set_create_form(&self, name: String, value: String) {
        self.state.lock().await.set_create_form(name, value);
    }

    pub async fn save_created_secret(&self) -> DashboardResult<Vec<Notice>> {
        let draft = self.state.lock().await.create_draft(self.session.user_id)?;

        let mut notices = Vec::new();
        self.authenticate(&mut notices).await?;
        self.insert_secret(draft).await?;

        self.state.lock().await.secret_created();
        notices.push(Notice::success("Secret saved to the vault!"));
        notices.extend(self.reload_secrets().await);
        Ok(notices)
    }

    //=====================================================================================
    // Generate Panel
    //=====================================================================================

    /// Replaces the generated value. Not gated.
    pub async fn generate(&self) -> String {
        let value = generate_secret();
        self.state.lock().await.set_generated_value(value.clone());
        value
    }

    pub async fn set_generated_name(&self, name: String) {
        self.state.lock().await.set_generated_name(name);
    }

    pub async fn save_generated_secret(&self) -> DashboardResult<Vec<Notice>> {
        let draft = self.state.lock().await.generated_draft(self.session.user_id)?;

        let mut notices = Vec::new();
        self.authenticate(&mut notices).await?;
        self.insert_secret(draft).await?;

        self.state.lock().await.generated_secret_saved();
        notices.push(Notice::success("Secret saved to the vault!"));
        notices.extend(self.reload_secrets().await);
        Ok(notices)
    }

    //=====================================================================================
    // Diary Panel
    //=====================================================================================

    pub async fn set_diary_form(&self, title: String, content: String, date: String) {
        self.state.lock().await.set_diary_form(title, content, date);
    }

    /// Saves the diary form. Unlike secrets, diary entries are not gated.
    pub async fn save_diary_entry(&self) -> DashboardResult<Vec<Notice>> {
        let draft = self.state.lock().await.diary_draft(self.session.user_id)?;
        let user = self.current_user().await?;
        let entry = NewDiaryEntry {
            owner_id: user.user_id,
            ..draft
        };
        self.deps
            .store
            .insert_diary_entry(entry)
            .await
            .map_err(|e| DashboardError::store("Saving the diary entry", e))?;

        self.state.lock().await.diary_entry_saved(Utc::now().date_naive());
        let mut notices = vec![Notice::success("Diary entry saved!")];
        notices.extend(self.reload_diary().await);
        Ok(notices)
    }
}
