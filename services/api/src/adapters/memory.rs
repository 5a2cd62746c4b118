//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the identity and record-store ports. Used for
//! local development (`STORE_BACKEND=memory`) and by the test suite.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use guardian_core::{
    DiaryEntry, IdentityService, NewDiaryEntry, NewSecret, PortError, PortResult, RecordStore,
    Secret, Session, SessionEvent, SessionEventStream, User, UserCredentials,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::events::SessionEvents;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    sessions: HashMap<String, Session>,
    secrets: Vec<Secret>,
    diary_entries: Vec<DiaryEntry>,
}

#[derive(Default)]
pub struct MemoryAdapter {
    tables: RwLock<Tables>,
    events: SessionEvents,
    unreachable: AtomicBool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail as if the hosted service could not be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn reachable(&self) -> PortResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(PortError::Unexpected("service unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for MemoryAdapter {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(PortError::Unexpected(format!("{} is already registered", email)));
        }
        let credentials = UserCredentials {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        let user = User {
            user_id: credentials.user_id,
            email: credentials.email.clone(),
        };
        tables.users.insert(credentials.user_id, credentials);
        Ok(user)
    }

    async fn get_credentials(&self, email: &str) -> PortResult<UserCredentials> {
        self.reachable()?;
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_session(&self, user_id: Uuid, ttl: Duration) -> PortResult<Session> {
        self.reachable()?;
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| PortError::Unexpected(format!("Session TTL {} is out of range", ttl)))?;
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id,
            expires_at,
        };
        let mut tables = self.tables.write().await;
        // Expired sessions are never announced; drop them here so the table stays bounded.
        tables.sessions.retain(|_, s| !s.is_expired(now));
        tables.sessions.insert(session.token.clone(), session.clone());
        drop(tables);
        self.events.publish(SessionEvent::SignedIn {
            token: session.token.clone(),
            user_id,
        });
        Ok(session)
    }

    async fn get_session(&self, token: &str) -> PortResult<Option<Session>> {
        self.reachable()?;
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(token)
            .filter(|s| !s.is_expired(Utc::now()))
            .cloned())
    }

    async fn get_user(&self, token: &str) -> PortResult<Option<User>> {
        let Some(session) = self.get_session(token).await? else {
            return Ok(None);
        };
        let tables = self.tables.read().await;
        Ok(tables.users.get(&session.user_id).map(|u| User {
            user_id: u.user_id,
            email: u.email.clone(),
        }))
    }

    async fn delete_session(&self, token: &str) -> PortResult<()> {
        self.reachable()?;
        let removed = self.tables.write().await.sessions.remove(token);
        if removed.is_some() {
            self.events.publish(SessionEvent::SignedOut {
                token: token.to_string(),
            });
        }
        Ok(())
    }

    fn session_changes(&self) -> SessionEventStream {
        self.events.subscribe()
    }
}

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for MemoryAdapter {
    async fn list_secrets(&self, owner_id: Uuid) -> PortResult<Vec<Secret>> {
        self.reachable()?;
        let tables = self.tables.read().await;
        let mut secrets: Vec<Secret> = tables
            .secrets
            .iter()
            .rev()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        secrets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(secrets)
    }

    async fn insert_secret(&self, secret: NewSecret) -> PortResult<Secret> {
        self.reachable()?;
        let record = Secret {
            id: Uuid::new_v4(),
            owner_id: secret.owner_id,
            name: secret.name,
            value: secret.value,
            created_at: Utc::now(),
        };
        self.tables.write().await.secrets.push(record.clone());
        Ok(record)
    }

    async fn delete_secret(&self, owner_id: Uuid, id: Uuid) -> PortResult<()> {
        self.reachable()?;
        let mut tables = self.tables.write().await;
        let before = tables.secrets.len();
        tables
            .secrets
            .retain(|s| !(s.id == id && s.owner_id == owner_id));
        if tables.secrets.len() == before {
            return Err(PortError::NotFound(format!("Secret {} not found", id)));
        }
        Ok(())
    }

    async fn list_diary_entries(&self, owner_id: Uuid) -> PortResult<Vec<DiaryEntry>> {
        self.reachable()?;
        let tables = self.tables.read().await;
        let mut entries: Vec<DiaryEntry> = tables
            .diary_entries
            .iter()
            .rev()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(entries)
    }

    async fn insert_diary_entry(&self, entry: NewDiaryEntry) -> PortResult<DiaryEntry> {
        self.reachable()?;
        let record = DiaryEntry {
            id: Uuid::new_v4(),
            owner_id: entry.owner_id,
            title: entry.title,
            content: entry.content,
            date: entry.date,
            created_at: Some(Utc::now()),
        };
        self.tables.write().await.diary_entries.push(record.clone());
        Ok(record)
    }
}
