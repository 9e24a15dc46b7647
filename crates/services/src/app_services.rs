use std::sync::Arc;

use hub_core::model::{Category, User};
use storage::repository::{Backend, LocalStore};
use storage::sqlite::SqliteLocalStore;
use storage::{InMemoryBackend, InMemoryLocalStore};

use crate::Clock;
use crate::admin_service::AdminService;
use crate::auth_service::AuthService;
use crate::autosave::AutoSaveCoordinator;
use crate::config::HubConfig;
use crate::error::AppServicesError;
use crate::profile_service::ProfileService;
use crate::progress_service::ProgressService;
use crate::state_store::StateStore;
use crate::telemetry::{EventQueue, PageTimeTracker};

/// Assembles the app-facing services around one state store and backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    state: StateStore,
    auth: Arc<AuthService>,
    progress: Arc<ProgressService>,
    autosave: Arc<AutoSaveCoordinator>,
    events: Arc<EventQueue>,
    admin: Arc<AdminService>,
    profiles: Arc<ProfileService>,
}

impl AppServices {
    /// Wire services over an already built backend and local store.
    pub async fn new(
        config: &HubConfig,
        backend: Backend,
        local: Arc<dyn LocalStore>,
        clock: Clock,
    ) -> Self {
        let state = StateStore::new();
        let auth = Arc::new(AuthService::new(
            Arc::clone(&backend.auth),
            Arc::clone(&backend.profiles),
            state.clone(),
            config.site_origin.clone(),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&backend.progress),
            state.clone(),
        ));
        let autosave = AutoSaveCoordinator::new(Arc::clone(&progress), config.autosave);
        let events = EventQueue::restore(
            Arc::clone(&backend.events),
            local,
            config.queue.clone(),
        )
        .await;
        let admin = Arc::new(AdminService::new(Arc::clone(&backend.profiles)));
        let profiles = Arc::new(ProfileService::new(
            Arc::clone(&backend.files),
            Arc::clone(&backend.profiles),
            state.clone(),
        ));

        Self {
            clock,
            state,
            auth,
            progress,
            autosave,
            events,
            admin,
            profiles,
        }
    }

    /// Hosted backend plus `SQLite` local storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the backend config is unusable or the
    /// local database cannot be opened.
    pub async fn connect(config: &HubConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let backend = Backend::supabase(config.backend.clone())?;
        let local = SqliteLocalStore::open(&config.local_db_url).await?;
        tracing::info!(backend = %config.backend.url, local = %config.local_db_url, "services connected");
        Ok(Self::new(config, backend, Arc::new(local), clock).await)
    }

    /// Everything in memory; used by tests and offline demos.
    pub async fn in_memory(
        config: &HubConfig,
        backend: &InMemoryBackend,
        local: &InMemoryLocalStore,
        clock: Clock,
    ) -> Self {
        Self::new(
            config,
            Backend::from_memory(backend),
            Arc::new(local.clone()),
            clock,
        )
        .await
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn autosave(&self) -> Arc<AutoSaveCoordinator> {
        Arc::clone(&self.autosave)
    }

    #[must_use]
    pub fn events(&self) -> Arc<EventQueue> {
        Arc::clone(&self.events)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    /// Start time tracking for a curriculum page.
    pub async fn track_page(&self, category: Category) -> Arc<PageTimeTracker> {
        let user = self.state.current_user().map(|u: User| u.id);
        PageTimeTracker::start(self.events(), self.clock, category.slug(), user).await
    }
}
