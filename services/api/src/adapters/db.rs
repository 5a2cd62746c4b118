//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `IdentityService` and `RecordStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use guardian_core::{
    DiaryEntry, IdentityService, NewDiaryEntry, NewSecret, PortError, PortResult, RecordStore,
    Secret, Session, SessionEvent, SessionEventStream, User, UserCredentials,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::events::SessionEvents;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the identity and record-store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    events: SessionEvents,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            events: SessionEvents::default(),
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl UserRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        Session {
            token: self.token,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct SecretRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    password: String,
    created_at: DateTime<Utc>,
}
impl SecretRecord {
    fn to_domain(self) -> Secret {
        Secret {
            id: self.id,
            owner_id: self.user_id,
            name: self.name,
            value: self.password,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct DiaryEntryRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    date: NaiveDate,
    created_at: Option<DateTime<Utc>>,
}
impl DiaryEntryRecord {
    fn to_domain(self) -> DiaryEntry {
        DiaryEntry {
            id: self.id,
            owner_id: self.user_id,
            title: self.title,
            content: self.content,
            date: self.date,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for DbAdapter {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(User {
            user_id: record.user_id,
            email: record.email,
        })
    }

    async fn get_credentials(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_session(&self, user_id: Uuid, ttl: Duration) -> PortResult<Session> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| PortError::Unexpected(format!("Session TTL {} is out of range", ttl)))?;
        let record = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO auth_sessions (token, user_id, expires_at) VALUES ($1, $2, $3) \
             RETURNING token, user_id, expires_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        let session = record.to_domain();
        self.events.publish(SessionEvent::SignedIn {
            token: session.token.clone(),
            user_id,
        });
        Ok(session)
    }

    async fn get_session(&self, token: &str) -> PortResult<Option<Session>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT token, user_id, expires_at FROM auth_sessions \
             WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(SessionRecord::to_domain))
    }

    async fn get_user(&self, token: &str) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.user_id, u.email, u.hashed_password FROM users u \
             JOIN auth_sessions s ON s.user_id = u.user_id \
             WHERE s.token = $1 AND s.expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| User {
            user_id: r.user_id,
            email: r.email,
        }))
    }

    async fn delete_session(&self, token: &str) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() > 0 {
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
impl RecordStore for DbAdapter {
    async fn list_secrets(&self, owner_id: Uuid) -> PortResult<Vec<Secret>> {
        let records = sqlx::query_as::<_, SecretRecord>(
            "SELECT id, user_id, name, password, created_at FROM passwords \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_secret(&self, secret: NewSecret) -> PortResult<Secret> {
        let record = sqlx::query_as::<_, SecretRecord>(
            "INSERT INTO passwords (id, user_id, name, password) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, name, password, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(secret.owner_id)
        .bind(secret.name)
        .bind(secret.value)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_secret(&self, owner_id: Uuid, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM passwords WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Secret {} not found", id)));
        }
        Ok(())
    }

    async fn list_diary_entries(&self, owner_id: Uuid) -> PortResult<Vec<DiaryEntry>> {
        let records = sqlx::query_as::<_, DiaryEntryRecord>(
            "SELECT id, user_id, title, content, date, created_at FROM diary_entries \
             WHERE user_id = $1 ORDER BY date DESC, created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_diary_entry(&self, entry: NewDiaryEntry) -> PortResult<DiaryEntry> {
        let record = sqlx::query_as::<_, DiaryEntryRecord>(
            "INSERT INTO diary_entries (id, user_id, title, content, date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, title, content, date, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(entry.owner_id)
        .bind(entry.title)
        .bind(entry.content)
        .bind(entry.date)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }
}
