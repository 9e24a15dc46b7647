use std::sync::Arc;

use hub_core::model::{Category, ProgressRecord, User};
use storage::repository::{ProgressRepository, ProgressRow};

use crate::Clock;
use crate::error::ProgressServiceError;
use crate::state_store::StateStore;

/// Loads and saves progress records, keeping the state store in sync.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
    state: StateStore,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>, state: StateStore) -> Self {
        Self { clock, repo, state }
    }

    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Read the stored record, or a fresh one carrying the user's cohort.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the backend read fails.
    pub async fn load(
        &self,
        user: &User,
        category: Category,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let row = self.repo.select_progress(&user.id, category).await?;
        Ok(row.map_or_else(
            || {
                let mut record = ProgressRecord::new(category);
                record.set_cohort(user.cohort.clone());
                record
            },
            record_from_row,
        ))
    }

    /// Cached record for the category, loading it once per session.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotSignedIn` without a user, or the
    /// load failure.
    pub async fn ensure_loaded(
        &self,
        category: Category,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        if self.state.is_loaded(category) {
            return Ok(self.state.progress(category));
        }
        let user = self
            .state
            .current_user()
            .ok_or(ProgressServiceError::NotSignedIn)?;
        let record = self.load(&user, category).await?;
        tracing::debug!(user = %user.id, %category, percent = record.percent(), "progress loaded");
        self.state.store_progress(record.clone(), true);
        Ok(record)
    }

    /// Write a record for the user, stamping `last_updated`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the upsert fails.
    pub async fn save(
        &self,
        user: &User,
        record: &ProgressRecord,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let mut record = record.clone();
        record.touch(self.clock.now());
        self.repo.upsert_progress(&row_from_record(user, &record)).await?;
        tracing::info!(user = %user.id, category = %record.category(), percent = record.percent(), "progress saved");
        Ok(record)
    }

    /// Save the cached record of the given category for the signed-in user.
    ///
    /// Only a record read from the backend for the current user is written,
    /// so a placeholder never overwrites stored progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotSignedIn` without a user,
    /// `ProgressServiceError::NotLoaded` if the category was not loaded for
    /// this user, or the save failure.
    pub async fn save_category(
        &self,
        category: Category,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        if self.state.current_user().is_none() {
            return Err(ProgressServiceError::NotSignedIn);
        }
        let (user, record) = self
            .state
            .loaded_progress(category)
            .ok_or(ProgressServiceError::NotLoaded(category))?;
        let saved = self.save(&user, &record).await?;
        if let Some(at) = saved.last_updated() {
            self.state.touch_progress(&user.id, category, at);
        }
        Ok(saved)
    }

    /// Save the record of the active curriculum page.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NoActiveCategory` outside a curriculum
    /// page, or the save failure.
    pub async fn save_current(&self) -> Result<ProgressRecord, ProgressServiceError> {
        let category = self
            .state
            .current_category()
            .ok_or(ProgressServiceError::NoActiveCategory)?;
        self.save_category(category).await
    }
}

/// Stored percentages are ignored; the record recomputes its own.
#[must_use]
pub fn record_from_row(row: ProgressRow) -> ProgressRecord {
    ProgressRecord::from_persisted(
        row.category,
        row.completed_tasks,
        row.task_notes,
        row.cohort,
        row.last_updated,
    )
}

#[must_use]
pub fn row_from_record(user: &User, record: &ProgressRecord) -> ProgressRow {
    ProgressRow {
        intern_id: user.id.clone(),
        category: record.category(),
        user_email: Some(user.email.clone()).filter(|email| !email.is_empty()),
        completed_tasks: record.completed_tasks().to_vec(),
        task_notes: record.task_notes().clone(),
        progress_percent: record.percent(),
        cohort: Some(record.cohort().to_string()),
        last_updated: record.last_updated(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::model::UserId;
    use hub_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryBackend;

    fn signed_in(backend: &InMemoryBackend) -> (ProgressService, User) {
        let state = StateStore::new();
        let user = User::new(UserId::new("u1"), "u1@example.com");
        state.set_user(Some(user.clone()));
        (
            ProgressService::new(fixed_clock(), Arc::new(backend.clone()), state),
            user,
        )
    }

    #[tokio::test]
    async fn missing_row_loads_as_empty_record_with_user_cohort() {
        let backend = InMemoryBackend::new();
        let (service, mut user) = signed_in(&backend);
        user.cohort = "fall-24".into();
        let record = service.load(&user, Category::PromptEngineering).await.unwrap();
        assert_eq!(record.total_days(), 5);
        assert_eq!(record.cohort(), "fall-24");
    }

    #[tokio::test]
    async fn stored_percent_is_recomputed() {
        let backend = InMemoryBackend::new();
        let (service, user) = signed_in(&backend);
        let mut row = row_from_record(&user, &ProgressRecord::new(Category::N8n));
        row.completed_tasks = vec![true, true, true];
        row.progress_percent = 99;
        storage::repository::ProgressRepository::upsert_progress(&backend, &row)
            .await
            .unwrap();

        let record = service.load(&user, Category::N8n).await.unwrap();
        assert_eq!(record.total_days(), 9);
        assert_eq!(record.percent(), 33);
    }

    #[tokio::test]
    async fn ensure_loaded_reads_backend_once() {
        let backend = InMemoryBackend::new();
        let (service, _) = signed_in(&backend);
        service.ensure_loaded(Category::N8n).await.unwrap();
        service
            .state()
            .update_progress(Category::N8n, |r| r.set_day(0, true))
            .unwrap();

        // A second call must not overwrite the local edit with backend data.
        let record = service.ensure_loaded(Category::N8n).await.unwrap();
        assert!(record.is_completed(0));
    }

    #[tokio::test]
    async fn save_current_writes_active_category() {
        let backend = InMemoryBackend::new();
        let (service, user) = signed_in(&backend);
        assert!(matches!(
            service.save_current().await,
            Err(ProgressServiceError::NoActiveCategory)
        ));

        service.state().set_current_category(Some(Category::N8n));
        service.ensure_loaded(Category::N8n).await.unwrap();
        service
            .state()
            .update_progress(Category::N8n, |r| {
                r.set_day(2, true)?;
                r.set_day(5, true)
            })
            .unwrap();
        let saved = service.save_current().await.unwrap();
        assert_eq!(saved.percent(), 22);
        assert_eq!(saved.last_updated(), Some(fixed_now()));

        let stored = backend.stored_progress(&user.id, Category::N8n).unwrap();
        assert_eq!(stored.progress_percent, 22);
        assert_eq!(stored.user_email.as_deref(), Some("u1@example.com"));
        assert_eq!(
            service.state().progress(Category::N8n).last_updated(),
            Some(fixed_now())
        );
    }

    #[tokio::test]
    async fn ensure_loaded_requires_user() {
        let backend = InMemoryBackend::new();
        let service =
            ProgressService::new(fixed_clock(), Arc::new(backend), StateStore::new());
        assert!(matches!(
            service.ensure_loaded(Category::AiTools).await,
            Err(ProgressServiceError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn unloaded_category_is_never_saved() {
        let backend = InMemoryBackend::new();
        let (service, user) = signed_in(&backend);
        service
            .state()
            .update_progress(Category::N8n, |r| r.set_day(0, true))
            .unwrap();

        assert!(matches!(
            service.save_category(Category::N8n).await,
            Err(ProgressServiceError::NotLoaded(Category::N8n))
        ));
        assert_eq!(backend.progress_writes(), 0);
        assert!(backend.stored_progress(&user.id, Category::N8n).is_none());
    }
}
