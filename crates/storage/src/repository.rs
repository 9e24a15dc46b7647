use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hub_core::model::{Category, EventType, QueuedEvent, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

// ─── Auth ──────────────────────────────────────────────────────────────────────

/// User object returned by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl AuthUser {
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
            user_metadata: Map::new(),
        }
    }

    /// `full_name` (or `name`, as Google fills it) from the user metadata.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        ["full_name", "name"]
            .iter()
            .find_map(|key| self.user_metadata.get(*key).and_then(Value::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

/// Broadcast whenever the backend session changes outside a direct call,
/// e.g. after an OAuth redirect completes.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthChange {
    SignedIn(AuthUser),
    SignedOut,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Session held by this client, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session store cannot be read.
    async fn get_session(&self) -> Result<Option<AuthSession>, StorageError>;

    /// Fetch the user behind the current session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or rejects the token.
    async fn get_user(&self) -> Result<Option<AuthUser>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` for bad credentials.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StorageError>;

    /// Create an account. `None` means the account awaits email confirmation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is taken, or other backend errors.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<Option<AuthSession>, StorageError>;

    /// Build the provider authorize URL the browser should be sent to.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the URL cannot be built.
    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, StorageError>;

    /// Adopt the session carried by an OAuth redirect. `None` when the URL
    /// carries no token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the token is rejected.
    async fn complete_oauth_redirect(
        &self,
        callback_url: &str,
    ) -> Result<Option<AuthSession>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend refuses to end the session.
    async fn sign_out(&self) -> Result<(), StorageError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

// ─── Progress ──────────────────────────────────────────────────────────────────

/// Row of the `intern_progress` table, unique per (`intern_id`, `category`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRow {
    pub intern_id: UserId,
    pub category: Category,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub completed_tasks: Vec<bool>,
    #[serde(default)]
    pub task_notes: BTreeMap<usize, String>,
    #[serde(default)]
    pub progress_percent: u8,
    #[serde(default)]
    pub cohort: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert or overwrite the row for (`intern_id`, `category`).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_progress(&self, row: &ProgressRow) -> Result<ProgressRow, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing row is `Ok(None)`.
    async fn select_progress(
        &self,
        intern_id: &UserId,
        category: Category,
    ) -> Result<Option<ProgressRow>, StorageError>;
}

// ─── Profiles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub cohort: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

impl ProfileRow {
    #[must_use]
    pub fn intern(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
            full_name: None,
            role: Some("intern".to_string()),
            cohort: None,
            resume_url: None,
        }
    }
}

/// Profile joined with all of its progress rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternOverviewRow {
    #[serde(flatten)]
    pub profile: ProfileRow,
    #[serde(default, rename = "intern_progress")]
    pub progress: Vec<ProgressRow>,
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing profile is `Ok(None)`.
    async fn get_profile(&self, id: &UserId) -> Result<Option<ProfileRow>, StorageError>;

    /// Every profile with role `intern`, with its progress rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_interns_with_progress(&self) -> Result<Vec<InternOverviewRow>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be updated.
    async fn set_resume_url(&self, id: &UserId, url: &str) -> Result<(), StorageError>;
}

// ─── Events ────────────────────────────────────────────────────────────────────

/// Row of the `page_events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub user_id: Option<UserId>,
    pub page: String,
    pub event_type: EventType,
    pub event_props: Map<String, Value>,
    pub ts: DateTime<Utc>,
}

impl From<&QueuedEvent> for EventRow {
    fn from(event: &QueuedEvent) -> Self {
        let mut props = event.props.clone();
        props
            .entry("sessionId")
            .or_insert_with(|| Value::String(event.session_id.to_string()));
        Self {
            user_id: event.user_id.clone(),
            page: event.page.clone(),
            event_type: event.event_type,
            event_props: props,
            ts: event.ts,
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Insert a batch of events in one request.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch is rejected; nothing is assumed stored.
    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), StorageError>;
}

// ─── Files ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload (or replace) a file and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the upload fails.
    async fn upload_file(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

// ─── Local durable storage ─────────────────────────────────────────────────────

/// Small key/value store that survives restarts (the browser's local storage).
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be removed.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Aggregates the hosted backend's facets behind trait objects for easy swapping.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthBackend>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub events: Arc<dyn EventSink>,
    pub files: Arc<dyn FileStore>,
}

impl Backend {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(&crate::memory::InMemoryBackend::new())
    }

    /// Share one in-memory backend across every facet.
    #[must_use]
    pub fn from_memory(backend: &crate::memory::InMemoryBackend) -> Self {
        Self {
            auth: Arc::new(backend.clone()),
            progress: Arc::new(backend.clone()),
            profiles: Arc::new(backend.clone()),
            events: Arc::new(backend.clone()),
            files: Arc::new(backend.clone()),
        }
    }
}
