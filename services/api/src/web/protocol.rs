//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API server
//! for the vault dashboard.

use chrono::{DateTime, NaiveDate, Utc};
use guardian_core::{DiaryEntry, Drawer, Panel, Secret, VaultViewState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Requests Sent FROM the Client (Browser) TO the Server
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PanelName {
    Vault,
    Create,
    Generate,
    Diary,
}

impl From<Panel> for PanelName {
    fn from(panel: Panel) -> Self {
        match panel {
            Panel::Vault => PanelName::Vault,
            Panel::Create => PanelName::Create,
            Panel::Generate => PanelName::Generate,
            Panel::Diary => PanelName::Diary,
        }
    }
}

impl From<PanelName> for Panel {
    fn from(name: PanelName) -> Self {
        match name {
            PanelName::Vault => Panel::Vault,
            PanelName::Create => Panel::Create,
            PanelName::Generate => Panel::Generate,
            PanelName::Diary => Panel::Diary,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectPanelRequest {
    pub panel: PanelName,
}

/// Full replacement of the create-panel form fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFormRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GeneratedNameRequest {
    #[serde(default)]
    pub name: String,
}

/// Full replacement of the diary form fields. `date` is `YYYY-MM-DD`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DiaryFormRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub date: String,
}

//=========================================================================================
// Responses Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the user, e.g. a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// One entry in the open vault. Never carries the value.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SecretSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Secret> for SecretSummary {
    fn from(secret: &Secret) -> Self {
        Self {
            id: secret.id,
            name: secret.name.clone(),
            created_at: secret.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawerView {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// The plaintext when `revealed`, otherwise a fixed-width mask.
    pub value: String,
    pub revealed: bool,
    pub copied: bool,
}

impl From<&Drawer> for DrawerView {
    fn from(drawer: &Drawer) -> Self {
        Self {
            id: drawer.secret.id,
            name: drawer.secret.name.clone(),
            created_at: drawer.secret.created_at,
            value: drawer.display_value().to_string(),
            revealed: drawer.show_value,
            copied: drawer.copied,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiaryEntryView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&DiaryEntry> for DiaryEntryView {
    fn from(entry: &DiaryEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            content: entry.content.clone(),
            date: entry.date,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateFormView {
    pub name: String,
    /// Whether a value has been typed; the value itself is not echoed back.
    pub has_value: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerateFormView {
    pub name: String,
    pub generated: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiaryFormView {
    pub title: String,
    pub content: String,
    pub date: String,
}

/// Diary content; only present once the diary is unlocked and its panel is active.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiaryView {
    pub form: DiaryFormView,
    pub entries: Vec<DiaryEntryView>,
}

/// Everything the client needs to render the dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardView {
    pub panel: PanelName,
    pub secret_count: usize,
    pub vault_open: bool,
    /// Populated only while the vault overlay is open.
    pub secrets: Vec<SecretSummary>,
    pub drawer: Option<DrawerView>,
    pub diary_unlocked: bool,
    pub diary: Option<DiaryView>,
    pub create_form: CreateFormView,
    pub generate_form: GenerateFormView,
}

impl From<&VaultViewState> for DashboardView {
    fn from(state: &VaultViewState) -> Self {
        let secrets = if state.vault_open() {
            state.secrets().iter().map(SecretSummary::from).collect()
        } else {
            Vec::new()
        };
        let diary = state.diary_visible().then(|| {
            let form = state.diary_form();
            DiaryView {
                form: DiaryFormView {
                    title: form.title.clone(),
                    content: form.content.clone(),
                    date: form.date.clone(),
                },
                entries: state.diary_entries().iter().map(DiaryEntryView::from).collect(),
            }
        });
        Self {
            panel: state.panel().into(),
            secret_count: state.secrets().len(),
            vault_open: state.vault_open(),
            secrets,
            drawer: state.drawer().map(DrawerView::from),
            diary_unlocked: state.diary_unlocked(),
            diary,
            create_form: CreateFormView {
                name: state.create_form().name.clone(),
                has_value: !state.create_form().value.is_empty(),
            },
            generate_form: GenerateFormView {
                name: state.generate_form().name.clone(),
                generated: state.generate_form().generated.clone(),
            },
        }
    }
}

/// The response to every dashboard action.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionResponse {
    pub view: DashboardView,
    pub notices: Vec<Notice>,
}

/// The response to the copy action: the plaintext for the client's clipboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CopyResponse {
    pub value: String,
    pub view: DashboardView,
    pub notices: Vec<Notice>,
}
