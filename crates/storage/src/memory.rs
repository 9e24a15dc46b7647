use async_trait::async_trait;
use hub_core::model::{Category, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use url::Url;
use uuid::Uuid;

use crate::repository::{
    AuthBackend, AuthChange, AuthSession, AuthUser, EventRow, EventSink, FileStore,
    InternOverviewRow, LocalStore, ProfileRepository, ProgressRepository, ProgressRow, ProfileRow,
    StorageError,
};

const AUTH_CHANNEL_CAPACITY: usize = 16;

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, UserId>,
    session: Option<AuthSession>,
    profiles: HashMap<UserId, ProfileRow>,
    progress: HashMap<(UserId, Category), ProgressRow>,
    events: Vec<EventRow>,
    files: HashMap<String, Vec<u8>>,
    progress_writes: usize,
}

/// Whole hosted backend kept in memory, for tests and offline development.
///
/// Models a single client: one active session at a time.
#[derive(Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    changes: broadcast::Sender<AuthChange>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            changes,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Seed an account with a profile. Returns the created auth user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<AuthUser, StorageError> {
        let mut state = self.lock()?;
        let key = email.trim().to_ascii_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        let user = AuthUser::new(UserId::new(Uuid::new_v4().to_string()), email.trim());
        let mut profile = ProfileRow::intern(user.id.clone(), email.trim());
        profile.role = Some(role.to_string());
        state.profiles.insert(user.id.clone(), profile);
        state.accounts.insert(
            key,
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        Ok(user)
    }

    /// Replace a stored profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn put_profile(&self, profile: ProfileRow) -> Result<(), StorageError> {
        self.lock()?.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Callback URL the provider would redirect to after a successful OAuth
    /// login for an already registered email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown email.
    pub fn oauth_callback_for(&self, email: &str, origin: &str) -> Result<String, StorageError> {
        let mut state = self.lock()?;
        let key = email.trim().to_ascii_lowercase();
        let user_id = state
            .accounts
            .get(&key)
            .map(|account| account.user.id.clone())
            .ok_or(StorageError::NotFound)?;
        let token = format!("oauth-{}", Uuid::new_v4());
        state.tokens.insert(token.clone(), user_id);
        Ok(format!(
            "{}/#access_token={token}&token_type=bearer&expires_in=3600",
            origin.trim_end_matches('/')
        ))
    }

    #[must_use]
    pub fn progress_writes(&self) -> usize {
        self.lock().map(|s| s.progress_writes).unwrap_or_default()
    }

    #[must_use]
    pub fn stored_progress(&self, user: &UserId, category: Category) -> Option<ProgressRow> {
        self.lock()
            .ok()
            .and_then(|s| s.progress.get(&(user.clone(), category)).cloned())
    }

    #[must_use]
    pub fn events(&self) -> Vec<EventRow> {
        self.lock().map(|s| s.events.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn file(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .ok()
            .and_then(|s| s.files.get(&format!("{bucket}/{path}")).cloned())
    }

    fn open_session(state: &mut MemoryState, user: AuthUser) -> AuthSession {
        let token = format!("token-{}", Uuid::new_v4());
        state.tokens.insert(token.clone(), user.id.clone());
        let session = AuthSession {
            access_token: token,
            refresh_token: None,
            expires_at: None,
            user,
        };
        state.session = Some(session.clone());
        session
    }

    fn announce(&self, change: AuthChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, StorageError> {
        Ok(self.lock()?.session.clone())
    }

    async fn get_user(&self) -> Result<Option<AuthUser>, StorageError> {
        Ok(self.lock()?.session.as_ref().map(|s| s.user.clone()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StorageError> {
        let session = {
            let mut state = self.lock()?;
            let key = email.trim().to_ascii_lowercase();
            let user = match state.accounts.get(&key) {
                Some(account) if account.password == password => account.user.clone(),
                _ => {
                    return Err(StorageError::Unauthorized(
                        "Invalid login credentials".to_string(),
                    ));
                }
            };
            Self::open_session(&mut state, user)
        };
        self.announce(AuthChange::SignedIn(session.user.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect_to: Option<&str>,
    ) -> Result<Option<AuthSession>, StorageError> {
        let user = self.register(email, password, "intern")?;
        let session = {
            let mut state = self.lock()?;
            Self::open_session(&mut state, user)
        };
        self.announce(AuthChange::SignedIn(session.user.clone()));
        Ok(Some(session))
    }

    async fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: &str,
    ) -> Result<String, StorageError> {
        let mut url = Url::parse("memory://auth/authorize")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(url.to_string())
    }

    async fn complete_oauth_redirect(
        &self,
        callback_url: &str,
    ) -> Result<Option<AuthSession>, StorageError> {
        let Some(token) = crate::supabase::access_token_from_callback(callback_url) else {
            return Ok(None);
        };
        let session = {
            let mut state = self.lock()?;
            let user_id = state
                .tokens
                .get(&token)
                .cloned()
                .ok_or_else(|| StorageError::Unauthorized("unknown access token".into()))?;
            let user = state
                .accounts
                .values()
                .find(|account| account.user.id == user_id)
                .map(|account| account.user.clone())
                .ok_or(StorageError::NotFound)?;
            let session = AuthSession {
                access_token: token,
                refresh_token: None,
                expires_at: None,
                user,
            };
            state.session = Some(session.clone());
            session
        };
        self.announce(AuthChange::SignedIn(session.user.clone()));
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<(), StorageError> {
        let previous = {
            let mut state = self.lock()?;
            let previous = state.session.take();
            if let Some(session) = &previous {
                state.tokens.remove(&session.access_token);
            }
            previous
        };
        if previous.is_some() {
            self.announce(AuthChange::SignedOut);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryBackend {
    async fn upsert_progress(&self, row: &ProgressRow) -> Result<ProgressRow, StorageError> {
        let mut state = self.lock()?;
        state
            .progress
            .insert((row.intern_id.clone(), row.category), row.clone());
        state.progress_writes += 1;
        Ok(row.clone())
    }

    async fn select_progress(
        &self,
        intern_id: &UserId,
        category: Category,
    ) -> Result<Option<ProgressRow>, StorageError> {
        Ok(self
            .lock()?
            .progress
            .get(&(intern_id.clone(), category))
            .cloned())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryBackend {
    async fn get_profile(&self, id: &UserId) -> Result<Option<ProfileRow>, StorageError> {
        Ok(self.lock()?.profiles.get(id).cloned())
    }

    async fn list_interns_with_progress(&self) -> Result<Vec<InternOverviewRow>, StorageError> {
        let state = self.lock()?;
        let mut rows: Vec<InternOverviewRow> = state
            .profiles
            .values()
            .filter(|profile| profile.role.as_deref().unwrap_or("intern") == "intern")
            .map(|profile| {
                let mut progress: Vec<ProgressRow> = state
                    .progress
                    .values()
                    .filter(|row| row.intern_id == profile.id)
                    .cloned()
                    .collect();
                progress.sort_by_key(|row| row.category);
                InternOverviewRow {
                    profile: profile.clone(),
                    progress,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.profile.email.cmp(&b.profile.email));
        Ok(rows)
    }

    async fn set_resume_url(&self, id: &UserId, url: &str) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let profile = state.profiles.get_mut(id).ok_or(StorageError::NotFound)?;
        profile.resume_url = Some(url.to_string());
        Ok(())
    }
}

#[async_trait]
impl EventSink for InMemoryBackend {
    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), StorageError> {
        self.lock()?.events.extend_from_slice(rows);
        Ok(())
    }
}

#[async_trait]
impl FileStore for InMemoryBackend {
    async fn upload_file(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.lock()?.files.insert(format!("{bucket}/{path}"), bytes);
        Ok(format!("memory://storage/{bucket}/{path}"))
    }
}

/// Local storage kept in memory.
#[derive(Clone, Default)]
pub struct InMemoryLocalStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().ok().and_then(|v| v.get(key).cloned())
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}
