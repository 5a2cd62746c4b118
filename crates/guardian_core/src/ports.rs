//! crates/guardian_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the hosted identity provider and record store.

use async_trait::async_trait;
use chrono::Duration;
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{
    DiaryEntry, NewDiaryEntry, NewSecret, Secret, Session, SessionEvent, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A boxed stream of session change notifications.
pub type SessionEventStream = Pin<Box<dyn Stream<Item = SessionEvent> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityService: Send + Sync {
    // --- Accounts ---
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_credentials(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Sessions ---
    async fn create_session(&self, user_id: Uuid, ttl: Duration) -> PortResult<Session>;

    /// Returns `None` for unknown or expired tokens.
    async fn get_session(&self, token: &str) -> PortResult<Option<Session>>;

    async fn get_user(&self, token: &str) -> PortResult<Option<User>>;

    /// Sign-out. Deleting an unknown token is not an error.
    async fn delete_session(&self, token: &str) -> PortResult<()>;

    /// Push notifications for sign-in and sign-out, so nobody has to poll.
    fn session_changes(&self) -> SessionEventStream;
}

/// The two owner-scoped record collections. There is deliberately no update operation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Newest first.
    async fn list_secrets(&self, owner_id: Uuid) -> PortResult<Vec<Secret>>;

    async fn insert_secret(&self, secret: NewSecret) -> PortResult<Secret>;

    /// `NotFound` when the row is already gone.
    async fn delete_secret(&self, owner_id: Uuid, id: Uuid) -> PortResult<()>;

    /// Latest `date` first; entries sharing a date are newest first.
    async fn list_diary_entries(&self, owner_id: Uuid) -> PortResult<Vec<DiaryEntry>>;

    async fn insert_diary_entry(&self, entry: NewDiaryEntry) -> PortResult<DiaryEntry>;
}

/// A local re-authentication step (platform biometric or PIN entry).
#[async_trait]
pub trait BiometricGate: Send + Sync {
    /// Must return promptly with `GateOutcome::Cancelled` once `cancel` fires.
    async fn authenticate(&self, cancel: CancellationToken) -> crate::biometric::GateOutcome;
}
