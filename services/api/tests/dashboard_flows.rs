//! services/api/tests/dashboard_flows.rs
//!
//! Drives a mounted dashboard through whole user flows against the in-memory store.

use api_lib::{
    adapters::MemoryAdapter,
    config::Config,
    error::DashboardError,
    web::{state::AppState, Dashboard, DashboardDeps},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use guardian_core::{
    BiometricGate, DiaryEntry, GateOutcome, IdentityService, NewDiaryEntry, NewSecret, Panel,
    PortResult, RecordStore, Secret, Session, SimulatedBiometricGate, ValidationError,
    VALUE_MASK,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// Test Gates
//=========================================================================================

/// Grants every prompt and counts how often it was asked.
#[derive(Default)]
struct CountingGate {
    prompts: AtomicUsize,
}

#[async_trait]
impl BiometricGate for CountingGate {
    async fn authenticate(&self, _cancel: CancellationToken) -> GateOutcome {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        GateOutcome::Granted
    }
}

struct DenyingGate;

#[async_trait]
impl BiometricGate for DenyingGate {
    async fn authenticate(&self, _cancel: CancellationToken) -> GateOutcome {
        GateOutcome::Denied
    }
}

/// Never answers on its own.
struct StalledGate;

#[async_trait]
impl BiometricGate for StalledGate {
    async fn authenticate(&self, cancel: CancellationToken) -> GateOutcome {
        cancel.cancelled().await;
        GateOutcome::Cancelled
    }
}

/// Delays every listing so a first load stays in flight for a while.
struct SlowListings {
    inner: Arc<MemoryAdapter>,
    delay: Duration,
}

#[async_trait]
impl RecordStore for SlowListings {
    async fn list_secrets(&self, owner_id: uuid::Uuid) -> PortResult<Vec<Secret>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_secrets(owner_id).await
    }

    async fn insert_secret(&self, secret: NewSecret) -> PortResult<Secret> {
        self.inner.insert_secret(secret).await
    }

    async fn delete_secret(&self, owner_id: uuid::Uuid, id: uuid::Uuid) -> PortResult<()> {
        self.inner.delete_secret(owner_id, id).await
    }

    async fn list_diary_entries(&self, owner_id: uuid::Uuid) -> PortResult<Vec<DiaryEntry>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_diary_entries(owner_id).await
    }

    async fn insert_diary_entry(&self, entry: NewDiaryEntry) -> PortResult<DiaryEntry> {
        self.inner.insert_diary_entry(entry).await
    }
}

//=========================================================================================
// Harness
//=========================================================================================

struct Harness {
    store: Arc<MemoryAdapter>,
    session: Session,
    dashboard: Arc<Dashboard>,
}

async fn mount(gate: Arc<dyn BiometricGate>) -> Harness {
    let store = Arc::new(MemoryAdapter::new());
    let user = store.create_user("owner@example.com", "hash").await.unwrap();
    let session = store
        .create_session(user.user_id, chrono::Duration::days(30))
        .await
        .unwrap();

    let config = Config::default();
    let deps = DashboardDeps {
        identity: store.clone(),
        store: store.clone(),
        gate,
        gate_timeout: config.gate_timeout,
        copy_confirmation: config.copy_confirmation,
    };
    let dashboard = Arc::new(Dashboard::new(session.clone(), deps));
    assert!(dashboard.load().await.is_empty());

    Harness {
        store,
        session,
        dashboard,
    }
}

async fn mount_granting() -> Harness {
    mount(Arc::new(SimulatedBiometricGate::default())).await
}

async fn seed_secret(h: &Harness, name: &str, value: &str) -> uuid::Uuid {
    let secret = h
        .store
        .insert_secret(NewSecret {
            owner_id: h.session.user_id,
            name: name.to_string(),
            value: value.to_string(),
        })
        .await
        .unwrap();
    h.dashboard.load().await;
    secret.id
}

//=========================================================================================
// Mounting
//=========================================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_first_requests_both_see_the_loaded_lists() {
    let memory = Arc::new(MemoryAdapter::new());
    let user = memory.create_user("owner@example.com", "hash").await.unwrap();
    let session = memory
        .create_session(user.user_id, chrono::Duration::days(30))
        .await
        .unwrap();
    memory
        .insert_secret(NewSecret {
            owner_id: user.user_id,
            name: "Email".to_string(),
            value: "hunter2".to_string(),
        })
        .await
        .unwrap();

    let store = Arc::new(SlowListings {
        inner: memory.clone(),
        delay: Duration::from_millis(500),
    });
    let state = AppState::new(
        memory.clone(),
        store,
        Arc::new(SimulatedBiometricGate::default()),
        Arc::new(Config::default()),
    );

    let late = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let (dashboard, _) = state.dashboard_for(&session).await;
        dashboard.view().await.secret_count
    };
    let first = async {
        let (dashboard, _) = state.dashboard_for(&session).await;
        dashboard.view().await.secret_count
    };
    let (first_count, late_count) = tokio::join!(first, late);

    assert_eq!(first_count, 1);
    assert_eq!(late_count, 1);
    assert_eq!(state.dashboards.mounted_count().await, 1);
}

//=========================================================================================
// Generate and Create
//=========================================================================================

#[tokio::test(start_paused = true)]
async fn generated_secret_lands_in_the_vault() {
    let started = Utc::now();
    let h = mount_granting().await;

    let value = h.dashboard.generate().await;
    assert_eq!(value.chars().count(), 16);
    h.dashboard.set_generated_name("Email".to_string()).await;

    let notices = h.dashboard.save_generated_secret().await.unwrap();
    assert!(notices.iter().any(|n| n.message == "Secret saved to the vault!"));

    h.dashboard.select_panel(Panel::Vault).await.unwrap();
    h.dashboard.open_vault().await.unwrap();

    let view = h.dashboard.view().await;
    assert_eq!(view.secret_count, 1);
    assert_eq!(view.secrets.len(), 1);
    assert_eq!(view.secrets[0].name, "Email");
    assert!(view.secrets[0].created_at >= started);
    assert_eq!(view.generate_form.name, "");
    assert_eq!(view.generate_form.generated, "");

    let stored = h.store.list_secrets(h.session.user_id).await.unwrap();
    assert_eq!(stored[0].value, value);
}

#[tokio::test(start_paused = true)]
async fn generating_twice_replaces_the_value_without_a_prompt() {
    let gate = Arc::new(CountingGate::default());
    let h = mount(gate.clone()).await;

    let first = h.dashboard.generate().await;
    let second = h.dashboard.generate().await;
    assert_ne!(first, second);
    let shown = h.dashboard.with_state(|s| s.generate_form().generated.clone()).await;
    assert_eq!(shown, second);
    assert_eq!(gate.prompts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn incomplete_create_form_is_rejected_before_the_gate() {
    let gate = Arc::new(CountingGate::default());
    let h = mount(gate.clone()).await;
    h.dashboard.select_panel(Panel::Create).await.unwrap();
    h.dashboard
        .set_create_form(String::new(), "hunter2".to_string())
        .await;

    let err = h.dashboard.save_created_secret().await.unwrap_err();
    assert_eq!(
        err,
        DashboardError::Validation(ValidationError::MissingSecretFields)
    );
    assert_eq!(gate.prompts.load(Ordering::SeqCst), 0);
    assert!(h.store.list_secrets(h.session.user_id).await.unwrap().is_empty());
    assert_eq!(h.dashboard.with_state(|s| s.panel()).await, Panel::Create);
}

#[tokio::test(start_paused = true)]
async fn generated_save_without_a_name_is_rejected() {
    let h = mount_granting().await;
    h.dashboard.generate().await;

    let err = h.dashboard.save_generated_secret().await.unwrap_err();
    assert_eq!(
        err,
        DashboardError::Validation(ValidationError::MissingGeneratedFields)
    );
    assert!(h.store.list_secrets(h.session.user_id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn created_secret_clears_the_form_and_returns_to_the_vault() {
    let h = mount_granting().await;
    h.dashboard.select_panel(Panel::Create).await.unwrap();
    h.dashboard
        .set_create_form("Bank".to_string(), "s3cret".to_string())
        .await;
    h.dashboard.save_created_secret().await.unwrap();
    assert_eq!(h.dashboard.with_state(|s| s.panel()).await, Panel::Vault);

    let view = h.dashboard.view().await;
    assert_eq!(view.secret_count, 1);
    assert_eq!(view.create_form.name, "");
    assert!(!view.create_form.has_value);
}

//=========================================================================================
// Gate Outcomes
//=========================================================================================

#[tokio::test(start_paused = true)]
async fn denied_gate_leaves_the_form_and_store_untouched() {
    let h = mount(Arc::new(DenyingGate)).await;
    h.dashboard
        .set_create_form("Bank".to_string(), "s3cret".to_string())
        .await;

    let err = h.dashboard.save_created_secret().await.unwrap_err();
    assert_eq!(err, DashboardError::GateDenied);
    assert!(h.store.list_secrets(h.session.user_id).await.unwrap().is_empty());
    let name = h.dashboard.with_state(|s| s.create_form().name.clone()).await;
    assert_eq!(name, "Bank");
}

#[tokio::test(start_paused = true)]
async fn stalled_gate_times_out() {
    let h = mount(Arc::new(StalledGate)).await;
    let err = h.dashboard.open_vault().await.unwrap_err();
    assert_eq!(err, DashboardError::GateTimedOut);
    assert!(!h.dashboard.with_state(|s| s.vault_open()).await);
}

#[tokio::test(start_paused = true)]
async fn unmount_cancels_a_pending_gate() {
    let h = mount(Arc::new(StalledGate)).await;
    let dashboard = h.dashboard.clone();
    let pending = tokio::spawn(async move { dashboard.open_vault().await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    h.dashboard.unmount();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err, DashboardError::GateCancelled);
    assert!(!h.dashboard.with_state(|s| s.vault_open()).await);
}

#[tokio::test(start_paused = true)]
async fn diary_prompts_only_on_first_visit() {
    let gate = Arc::new(CountingGate::default());
    let h = mount(gate.clone()).await;

    let notices = h.dashboard.select_panel(Panel::Diary).await.unwrap();
    assert!(notices.iter().any(|n| n.message == "Diary unlocked!"));
    h.dashboard.select_panel(Panel::Vault).await.unwrap();
    let notices = h.dashboard.select_panel(Panel::Diary).await.unwrap();

    assert!(notices.is_empty());
    assert_eq!(gate.prompts.load(Ordering::SeqCst), 1);
    assert!(h.dashboard.view().await.diary.is_some());
}

#[tokio::test(start_paused = true)]
async fn denied_diary_unlock_keeps_the_diary_hidden() {
    let h = mount(Arc::new(DenyingGate)).await;
    let err = h.dashboard.select_panel(Panel::Diary).await.unwrap_err();
    assert_eq!(err, DashboardError::GateDenied);

    let view = h.dashboard.view().await;
    assert!(!view.diary_unlocked);
    assert!(view.diary.is_none());
}

//=========================================================================================
// Vault and Drawer
//=========================================================================================

#[tokio::test(start_paused = true)]
async fn closed_vault_hides_secrets_but_still_counts_them() {
    let h = mount_granting().await;
    seed_secret(&h, "Email", "a").await;
    seed_secret(&h, "Bank", "b").await;

    let view = h.dashboard.view().await;
    assert_eq!(view.secret_count, 2);
    assert!(view.secrets.is_empty());
}

#[tokio::test(start_paused = true)]
async fn drawer_masks_until_revealed() {
    let h = mount_granting().await;
    let id = seed_secret(&h, "Email", "hunter2").await;
    h.dashboard.open_vault().await.unwrap();
    h.dashboard.open_secret(id).await.unwrap();

    let drawer = h.dashboard.view().await.drawer.unwrap();
    assert_eq!(drawer.value, VALUE_MASK);
    assert!(!drawer.revealed);

    assert!(h.dashboard.toggle_reveal().await.unwrap());
    assert_eq!(h.dashboard.view().await.drawer.unwrap().value, "hunter2");
    assert!(!h.dashboard.toggle_reveal().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn opening_a_secret_requires_an_open_vault() {
    let h = mount_granting().await;
    let id = seed_secret(&h, "Email", "hunter2").await;

    let err = h.dashboard.open_secret(id).await.unwrap_err();
    assert_eq!(err, DashboardError::VaultClosed);

    h.dashboard.open_vault().await.unwrap();
    let unknown = uuid::Uuid::new_v4();
    let err = h.dashboard.open_secret(unknown).await.unwrap_err();
    assert_eq!(err, DashboardError::UnknownSecret(unknown));
}

#[tokio::test(start_paused = true)]
async fn delete_during_the_gate_keeps_the_drawer_closed() {
    let h = mount_granting().await;
    let id = seed_secret(&h, "Email", "hunter2").await;
    h.dashboard.open_vault().await.unwrap();

    let dashboard = h.dashboard.clone();
    let opening = tokio::spawn(async move { dashboard.open_secret(id).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.dashboard.delete_secret(id).await.unwrap();

    let notices = opening.await.unwrap().unwrap();
    assert!(!notices.iter().any(|n| n.message == "Drawer open!"));
    let view = h.dashboard.view().await;
    assert!(view.drawer.is_none());
    assert_eq!(view.secret_count, 0);
    assert!(h.store.list_secrets(h.session.user_id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn closing_the_vault_closes_the_drawer() {
    let h = mount_granting().await;
    let id = seed_secret(&h, "Email", "hunter2").await;
    h.dashboard.open_vault().await.unwrap();
    h.dashboard.open_secret(id).await.unwrap();

    h.dashboard.close_vault().await;
    let view = h.dashboard.view().await;
    assert!(!view.vault_open);
    assert!(view.drawer.is_none());
}

#[tokio::test(start_paused = true)]
async fn copy_confirmation_clears_after_two_seconds() {
    let h = mount_granting().await;
    let id = seed_secret(&h, "Email", "hunter2").await;
    h.dashboard.open_vault().await.unwrap();
    h.dashboard.open_secret(id).await.unwrap();

    let (value, notices) = h.dashboard.copy_value().await.unwrap();
    assert_eq!(value, "hunter2");
    assert!(notices.iter().any(|n| n.message == "Secret copied!"));
    assert!(h.dashboard.view().await.drawer.unwrap().copied);

    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert!(h.dashboard.view().await.drawer.unwrap().copied);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!h.dashboard.view().await.drawer.unwrap().copied);
}

#[tokio::test(start_paused = true)]
async fn copy_without_a_drawer_is_an_error() {
    let h = mount_granting().await;
    let err = h.dashboard.copy_value().await.unwrap_err();
    assert_eq!(err, DashboardError::NoSecretSelected);
}

//=========================================================================================
// Delete
//=========================================================================================

#[tokio::test(start_paused = true)]
async fn deleting_the_open_secret_returns_to_the_vault_panel() {
    let h = mount_granting().await;
    let keep = seed_secret(&h, "Bank", "b").await;
    let id = seed_secret(&h, "Email", "a").await;
    h.dashboard.open_vault().await.unwrap();
    h.dashboard.open_secret(id).await.unwrap();

    let notices = h.dashboard.delete_secret(id).await.unwrap();
    assert!(notices.iter().any(|n| n.message == "Secret deleted"));

    let view = h.dashboard.view().await;
    assert!(view.drawer.is_none());
    assert!(!view.vault_open);
    assert_eq!(view.secret_count, 1);
    let remaining = h.store.list_secrets(h.session.user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep);
}

#[tokio::test(start_paused = true)]
async fn deleting_twice_is_harmless() {
    let h = mount_granting().await;
    let id = seed_secret(&h, "Email", "a").await;

    h.dashboard.delete_secret(id).await.unwrap();
    h.dashboard.delete_secret(id).await.unwrap();
    assert_eq!(h.dashboard.view().await.secret_count, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_delete_changes_nothing() {
    let h = mount_granting().await;
    let id = seed_secret(&h, "Email", "a").await;
    h.dashboard.open_vault().await.unwrap();
    h.dashboard.open_secret(id).await.unwrap();

    h.store.set_unreachable(true);
    let err = h.dashboard.delete_secret(id).await.unwrap_err();
    assert!(matches!(err, DashboardError::Store { .. }));

    let view = h.dashboard.view().await;
    assert!(view.drawer.is_some());
    assert_eq!(view.secret_count, 1);
}

//=========================================================================================
// Diary
//=========================================================================================

#[tokio::test(start_paused = true)]
async fn diary_entries_are_listed_newest_date_first() {
    let h = mount_granting().await;
    h.dashboard.select_panel(Panel::Diary).await.unwrap();

    for (title, date) in [("May", "2024-05-01"), ("June", "2024-06-01"), ("April", "2024-04-01")] {
        h.dashboard
            .set_diary_form(title.to_string(), "notes".to_string(), date.to_string())
            .await;
        h.dashboard.save_diary_entry().await.unwrap();
    }

    let diary = h.dashboard.view().await.diary.unwrap();
    let titles: Vec<_> = diary.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["June", "May", "April"]);
    assert_eq!(diary.form.title, "");
    assert_eq!(diary.form.content, "");
    assert_eq!(diary.form.date, Utc::now().date_naive().format("%Y-%m-%d").to_string());
}

#[tokio::test(start_paused = true)]
async fn new_diary_entry_sorts_between_a_later_and_an_earlier_one() {
    let h = mount_granting().await;
    h.dashboard.select_panel(Panel::Diary).await.unwrap();

    for (title, content, date) in [
        ("Later", "after", "2024-02-01"),
        ("Earlier", "before", "2023-12-31"),
        ("Day 1", "Hello", "2024-01-01"),
    ] {
        h.dashboard
            .set_diary_form(title.to_string(), content.to_string(), date.to_string())
            .await;
        h.dashboard.save_diary_entry().await.unwrap();
    }

    let diary = h.dashboard.view().await.diary.unwrap();
    let titles: Vec<_> = diary.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["Later", "Day 1", "Earlier"]);
    let day_one = &diary.entries[1];
    assert_eq!(day_one.content, "Hello");
    assert_eq!(day_one.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
}

#[tokio::test(start_paused = true)]
async fn diary_save_is_not_gated() {
    let gate = Arc::new(CountingGate::default());
    let h = mount(gate.clone()).await;
    h.dashboard
        .set_diary_form("Title".to_string(), "Body".to_string(), "2024-01-02".to_string())
        .await;
    h.dashboard.save_diary_entry().await.unwrap();

    assert_eq!(gate.prompts.load(Ordering::SeqCst), 0);
    let entries = h.store.list_diary_entries(h.session.user_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
}

#[tokio::test(start_paused = true)]
async fn malformed_diary_date_is_rejected() {
    let h = mount_granting().await;
    h.dashboard
        .set_diary_form("Title".to_string(), "Body".to_string(), "02/01/2024".to_string())
        .await;

    let err = h.dashboard.save_diary_entry().await.unwrap_err();
    assert!(matches!(
        err,
        DashboardError::Validation(ValidationError::InvalidDate(_))
    ));
    assert!(h.store.list_diary_entries(h.session.user_id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unreachable_store_keeps_the_diary_form() {
    let h = mount_granting().await;
    h.dashboard
        .set_diary_form("Title".to_string(), "Body".to_string(), "2024-01-02".to_string())
        .await;

    h.store.set_unreachable(true);
    let err = h.dashboard.save_diary_entry().await.unwrap_err();
    assert!(matches!(err, DashboardError::Store { .. }));
    let title = h.dashboard.with_state(|s| s.diary_form().title.clone()).await;
    assert_eq!(title, "Title");
}
