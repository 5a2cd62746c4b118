//! crates/guardian_core/src/view_state.rs
//!
//! The dashboard's in-memory view state: which of the four panels is shown, which
//! overlays are stacked on top, the creation forms, and the last loaded collections.
//!
//! Everything here is synchronous and side-effect free. Sequencing gates, store calls
//! and reloads around these transitions is the caller's job.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{DiaryEntry, NewDiaryEntry, NewSecret, Secret};

/// Shown in place of a secret value until the user reveals it.
pub const VALUE_MASK: &str = "••••••••••••";

/// Calendar format used by the diary form.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

//=========================================================================================
// Panels, Forms and Validation
//=========================================================================================

/// The four mutually exclusive top-level panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Panel {
    #[default]
    Vault,
    Create,
    Generate,
    Diary,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::Vault, Panel::Create, Panel::Generate, Panel::Diary];
}

/// Raised before any gate or store call when a form is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Fill in every field")]
    MissingSecretFields,
    #[error("Enter a name and generate a secret")]
    MissingGeneratedFields,
    #[error("Fill in title and content")]
    MissingDiaryFields,
    #[error("'{0}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretForm {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateForm {
    pub name: String,
    pub generated: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryForm {
    pub title: String,
    pub content: String,
    pub date: String,
}

impl DiaryForm {
    /// An empty form dated `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            date: today.format(DATE_FORMAT).to_string(),
        }
    }
}

//=========================================================================================
// Drawer (the selected-secret overlay)
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawer {
    pub secret: Secret,
    pub show_value: bool,
    pub copied: bool,
    copy_ticket: u64,
}

impl Drawer {
    fn new(secret: Secret) -> Self {
        Self {
            secret,
            show_value: false,
            copied: false,
            copy_ticket: 0,
        }
    }

    /// The value as it should be rendered right now.
    pub fn display_value(&self) -> &str {
        if self.show_value {
            &self.secret.value
        } else {
            VALUE_MASK
        }
    }
}

/// Out-of-order reload protection: only the most recently issued load may apply.
#[derive(Debug, Clone, Default)]
struct LoadSequence {
    issued: u64,
}

impl LoadSequence {
    fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn is_current(&self, seq: u64) -> bool {
        seq == self.issued
    }
}

//=========================================================================================
// VaultViewState
//=========================================================================================

#[derive(Debug, Clone)]
pub struct VaultViewState {
    panel: Panel,
    vault_open: bool,
    drawer: Option<Drawer>,
    diary_unlocked: bool,
    secrets: Vec<Secret>,
    diary_entries: Vec<DiaryEntry>,
    create_form: SecretForm,
    generate_form: GenerateForm,
    diary_form: DiaryForm,
    secrets_load: LoadSequence,
    diary_load: LoadSequence,
    copy_tickets: u64,
}

impl VaultViewState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            panel: Panel::default(),
            vault_open: false,
            drawer: None,
            diary_unlocked: false,
            secrets: Vec::new(),
            diary_entries: Vec::new(),
            create_form: SecretForm::default(),
            generate_form: GenerateForm::default(),
            diary_form: DiaryForm::new(today),
            secrets_load: LoadSequence::default(),
            diary_load: LoadSequence::default(),
            copy_tickets: 0,
        }
    }

    // --- Accessors ---

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn is_active(&self, panel: Panel) -> bool {
        self.panel == panel
    }

    pub fn vault_open(&self) -> bool {
        self.vault_open
    }

    pub fn drawer(&self) -> Option<&Drawer> {
        self.drawer.as_ref()
    }

    pub fn diary_unlocked(&self) -> bool {
        self.diary_unlocked
    }

    /// Diary content is only rendered once the diary has been unlocked this session.
    pub fn diary_visible(&self) -> bool {
        self.panel == Panel::Diary && self.diary_unlocked
    }

    pub fn secrets(&self) -> &[Secret] {
        &self.secrets
    }

    pub fn find_secret(&self, id: Uuid) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.id == id)
    }

    pub fn diary_entries(&self) -> &[DiaryEntry] {
        &self.diary_entries
    }

    pub fn create_form(&self) -> &SecretForm {
        &self.create_form
    }

    pub fn generate_form(&self) -> &GenerateForm {
        &self.generate_form
    }

    pub fn diary_form(&self) -> &DiaryForm {
        &self.diary_form
    }

    // --- Panels ---

    /// Switches panel. Returns `true` when the diary still needs its one-time unlock.
    pub fn select_panel(&mut self, panel: Panel) -> bool {
        self.panel = panel;
        panel == Panel::Diary && !self.diary_unlocked
    }

    /// Once unlocked the diary stays unlocked for the lifetime of this state.
    pub fn unlock_diary(&mut self) {
        self.diary_unlocked = true;
    }

    // --- Overlays ---

    pub fn open_vault(&mut self) {
        self.vault_open = true;
    }

    /// Closing the vault also closes the drawer stacked on it.
    pub fn close_vault(&mut self) {
        self.vault_open = false;
        self.drawer = None;
    }

    /// Opens the drawer on the listed secret `id`. Ignored (returns `false`) if the
    /// vault was closed, or the secret deleted, while the caller waited on the gate.
    pub fn open_drawer(&mut self, id: Uuid) -> bool {
        if !self.vault_open {
            return false;
        }
        let Some(secret) = self.find_secret(id).cloned() else {
            return false;
        };
        self.drawer = Some(Drawer::new(secret));
        true
    }

    pub fn close_drawer(&mut self) {
        self.drawer = None;
    }

    pub fn drawer_secret_id(&self) -> Option<Uuid> {
        self.drawer.as_ref().map(|d| d.secret.id)
    }

    /// Flips the reveal flag, returning the new value.
    pub fn toggle_reveal(&mut self) -> Option<bool> {
        let drawer = self.drawer.as_mut()?;
        drawer.show_value = !drawer.show_value;
        Some(drawer.show_value)
    }

    /// Sets the copy confirmation. Returns the ticket that may later clear it,
    /// together with the plaintext to hand to the clipboard.
    pub fn mark_copied(&mut self) -> Option<(u64, String)> {
        let drawer = self.drawer.as_mut()?;
        self.copy_tickets += 1;
        drawer.copied = true;
        drawer.copy_ticket = self.copy_tickets;
        Some((self.copy_tickets, drawer.secret.value.clone()))
    }

    /// Clears the confirmation only if it is still the one issued with `ticket`.
    pub fn clear_copied(&mut self, ticket: u64) -> bool {
        match self.drawer.as_mut() {
            Some(drawer) if drawer.copied && drawer.copy_ticket == ticket => {
                drawer.copied = false;
                true
            }
            _ => false,
        }
    }

    /// After a delete: the secret leaves the list at once, and any overlay showing
    /// `id` closes and the vault panel comes back.
    pub fn secret_deleted(&mut self, id: Uuid) -> bool {
        self.secrets.retain(|s| s.id != id);
        if self.drawer_secret_id() != Some(id) {
            return false;
        }
        self.close_vault();
        self.panel = Panel::Vault;
        true
    }

    // --- Collection reloads ---

    pub fn begin_secrets_load(&mut self) -> u64 {
        self.secrets_load.begin()
    }

    /// Returns `false` (and changes nothing) for a superseded load.
    pub fn apply_secrets(&mut self, seq: u64, secrets: Vec<Secret>) -> bool {
        if !self.secrets_load.is_current(seq) {
            return false;
        }
        self.secrets = secrets;
        // A drawer whose secret is gone from the store must not outlive it.
        if let Some(id) = self.drawer_secret_id() {
            if self.find_secret(id).is_none() {
                self.drawer = None;
            }
        }
        true
    }

    pub fn begin_diary_load(&mut self) -> u64 {
        self.diary_load.begin()
    }

    pub fn apply_diary_entries(&mut self, seq: u64, entries: Vec<DiaryEntry>) -> bool {
        if !self.diary_load.is_current(seq) {
            return false;
        }
        self.diary_entries = entries;
        true
    }

    // --- Create panel ---

    pub fn set_create_form(&mut self, name: String, value: String) {
        self.create_form = SecretForm { name, value };
    }

    pub fn create_draft(&self, owner_id: Uuid) -> Result<NewSecret, ValidationError> {
        let form = &self.create_form;
        if form.name.is_empty() || form.value.is_empty() {
            return Err(ValidationError::MissingSecretFields);
        }
        Ok(NewSecret {
            owner_id,
            name: form.name.clone(),
            value: form.value.clone(),
        })
    }

    pub fn secret_created(&mut self) {
        self.create_form = SecretForm::default();
        self.panel = Panel::Vault;
    }

    // --- Generate panel ---

    pub fn set_generated_name(&mut self, name: String) {
        self.generate_form.name = name;
    }

    pub fn set_generated_value(&mut self, value: String) {
        self.generate_form.generated = value;
    }

    pub fn generated_draft(&self, owner_id: Uuid) -> Result<NewSecret, ValidationError> {
        let form = &self.generate_form;
        if form.name.is_empty() || form.generated.is_empty() {
            return Err(ValidationError::MissingGeneratedFields);
        }
        Ok(NewSecret {
            owner_id,
            name: form.name.clone(),
            value: form.generated.clone(),
        })
    }

    pub fn generated_secret_saved(&mut self) {
        self.generate_form = GenerateForm::default();
        self.panel = Panel::Vault;
    }

    // --- Diary panel ---

    pub fn set_diary_form(&mut self, title: String, content: String, date: String) {
        self.diary_form = DiaryForm {
            title,
            content,
            date,
        };
    }

    pub fn diary_draft(&self, owner_id: Uuid) -> Result<NewDiaryEntry, ValidationError> {
        let form = &self.diary_form;
        if form.title.is_empty() || form.content.is_empty() {
            return Err(ValidationError::MissingDiaryFields);
        }
        let date = NaiveDate::parse_from_str(&form.date, DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidDate(form.date.clone()))?;
        Ok(NewDiaryEntry {
            owner_id,
            title: form.title.clone(),
            content: form.content.clone(),
            date,
        })
    }

    pub fn diary_entry_saved(&mut self, today: NaiveDate) {
        self.diary_form = DiaryForm::new(today);
    }
}
