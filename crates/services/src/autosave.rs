//! Debounced saving of the active curriculum page.
//!
//! Every edit calls [`AutoSaveCoordinator::schedule_save`]. Only the most
//! recent schedule survives: a new call aborts the pending timer and starts a
//! fresh one. Once the timer fires the save is detached from the pending slot,
//! so a later schedule can no longer cancel a save that already started.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::progress_service::ProgressService;

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period before a scheduled save runs.
    pub delay: Duration,
    /// How long the "saved" acknowledgment stays visible.
    pub ack_timeout: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_SAVE_DELAY,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

/// Transient acknowledgment shown after a background save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveIndicator {
    #[default]
    Idle,
    Saved,
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct AutoSaveCoordinator {
    progress: Arc<ProgressService>,
    config: AutoSaveConfig,
    pending: Mutex<Option<Pending>>,
    generation: AtomicU64,
    acks: AtomicU64,
    indicator: watch::Sender<SaveIndicator>,
}

impl AutoSaveCoordinator {
    #[must_use]
    pub fn new(progress: Arc<ProgressService>, config: AutoSaveConfig) -> Arc<Self> {
        let (indicator, _) = watch::channel(SaveIndicator::Idle);
        Arc::new(Self {
            progress,
            config,
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
            acks: AtomicU64::new(0),
            indicator,
        })
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel any pending save and schedule a new one after the delay.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule_save(self: &Arc<Self>) {
        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let this = Arc::clone(self);
        let delay = self.config.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire(generation).await;
        });
        *pending = Some(Pending { generation, handle });
    }

    /// Drop a pending save without running it.
    pub fn cancel(&self) {
        if let Some(previous) = self.lock_pending().take() {
            previous.handle.abort();
            tracing::debug!(generation = previous.generation, "pending auto-save cancelled");
        }
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.lock_pending().is_some()
    }

    #[must_use]
    pub fn indicator(&self) -> SaveIndicator {
        *self.indicator.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveIndicator> {
        self.indicator.subscribe()
    }

    async fn fire(&self, generation: u64) {
        {
            let mut pending = self.lock_pending();
            match pending.as_ref() {
                Some(current) if current.generation == generation => {
                    pending.take();
                }
                _ => return,
            }
        }

        match self.progress.save_current().await {
            Ok(record) => {
                tracing::debug!(category = %record.category(), "auto-save complete");
                self.acknowledge().await;
            }
            // Skipped cycles are retried by the next edit.
            Err(err) => tracing::error!(error = %err, "auto-save failed"),
        }
    }

    async fn acknowledge(&self) {
        let ack = self.acks.fetch_add(1, Ordering::SeqCst) + 1;
        self.indicator.send_replace(SaveIndicator::Saved);
        tokio::time::sleep(self.config.ack_timeout).await;
        if self.acks.load(Ordering::SeqCst) == ack {
            self.indicator.send_replace(SaveIndicator::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::StateStore;
    use hub_core::model::{Category, ProgressRecord, User, UserId};
    use hub_core::time::fixed_clock;
    use storage::InMemoryBackend;

    fn setup() -> (Arc<AutoSaveCoordinator>, StateStore, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        let state = StateStore::new();
        state.set_user(Some(User::new(UserId::new("u1"), "u1@example.com")));
        state.store_progress(ProgressRecord::new(Category::N8n), true);
        state.set_current_category(Some(Category::N8n));
        let progress = Arc::new(ProgressService::new(
            fixed_clock(),
            Arc::new(backend.clone()),
            state.clone(),
        ));
        let coordinator = AutoSaveCoordinator::new(progress, AutoSaveConfig::default());
        (coordinator, state, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_saves_once_with_last_state() {
        let (coordinator, state, backend) = setup();
        for day in 0..5 {
            state
                .update_progress(Category::N8n, |r| r.set_day(day, true))
                .unwrap();
            coordinator.schedule_save();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(backend.progress_writes(), 0);

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(backend.progress_writes(), 1);
        let stored = backend
            .stored_progress(&UserId::new("u1"), Category::N8n)
            .unwrap();
        assert_eq!(
            stored.completed_tasks,
            vec![true, true, true, true, true, false, false, false, false]
        );
        assert!(!coordinator.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledgment_dismisses_after_timeout() {
        let (coordinator, _state, _backend) = setup();
        coordinator.schedule_save();
        assert_eq!(coordinator.indicator(), SaveIndicator::Idle);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(coordinator.indicator(), SaveIndicator::Saved);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(coordinator.indicator(), SaveIndicator::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_logged_and_not_retried() {
        let (coordinator, state, backend) = setup();
        state.set_user(None);
        coordinator.schedule_save();
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(backend.progress_writes(), 0);
        assert_eq!(coordinator.indicator(), SaveIndicator::Idle);
        assert!(!coordinator.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_save() {
        let (coordinator, _state, backend) = setup();
        coordinator.schedule_save();
        assert!(coordinator.has_pending());
        coordinator.cancel();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(backend.progress_writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn identity_switch_during_delay_keeps_other_users_progress() {
        let (coordinator, state, backend) = setup();
        let other = User::new(UserId::new("u2"), "u2@example.com");
        let mut seeded = ProgressRecord::new(Category::N8n);
        for day in 0..4 {
            seeded.set_day(day, true).unwrap();
        }
        storage::repository::ProgressRepository::upsert_progress(
            &backend,
            &crate::progress_service::row_from_record(&other, &seeded),
        )
        .await
        .unwrap();

        state
            .update_progress(Category::N8n, |r| r.set_day(8, true))
            .unwrap();
        coordinator.schedule_save();
        state.set_user(Some(other.clone()));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let stored = backend.stored_progress(&other.id, Category::N8n).unwrap();
        assert_eq!(stored.completed_tasks.iter().filter(|done| **done).count(), 4);
        assert!(backend.stored_progress(&UserId::new("u1"), Category::N8n).is_none());
        assert_eq!(coordinator.indicator(), SaveIndicator::Idle);
    }
}
