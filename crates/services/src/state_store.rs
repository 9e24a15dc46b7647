use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use hub_core::model::{Category, ProgressError, ProgressPatch, ProgressRecord, User, UserId};

struct ProgressSlot {
    record: ProgressRecord,
    loaded: bool,
}

#[derive(Default)]
struct StoreState {
    user: Option<User>,
    current_category: Option<Category>,
    progress: HashMap<Category, ProgressSlot>,
}

/// Process-wide record of the signed-in user and per-category progress.
///
/// Cloning shares the same underlying state. Each category is loaded at most
/// once per sign-in; the `loaded` flag tells callers whether a backend read
/// already happened.
#[derive(Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<StoreState>>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation leaves the state consistent, so a poisoned lock is
    // still safe to read.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.read().user.clone()
    }

    /// Replace the user. Switching to a different identity drops cached
    /// progress and the active category.
    pub fn set_user(&self, user: Option<User>) {
        let mut state = self.write();
        let same = match (&state.user, &user) {
            (Some(old), Some(new)) => old.id == new.id,
            _ => false,
        };
        if !same {
            state.progress.clear();
            state.current_category = None;
        }
        state.user = user;
    }

    /// Forget the user and every cached record (sign-out).
    pub fn clear(&self) {
        let mut state = self.write();
        state.user = None;
        state.current_category = None;
        state.progress.clear();
    }

    #[must_use]
    pub fn current_category(&self) -> Option<Category> {
        self.read().current_category
    }

    pub fn set_current_category(&self, category: Option<Category>) {
        self.write().current_category = category;
    }

    /// Cached record for the category, or an empty one if nothing is cached.
    #[must_use]
    pub fn progress(&self, category: Category) -> ProgressRecord {
        self.read()
            .progress
            .get(&category)
            .map_or_else(|| ProgressRecord::new(category), |slot| slot.record.clone())
    }

    #[must_use]
    pub fn is_loaded(&self, category: Category) -> bool {
        self.read()
            .progress
            .get(&category)
            .is_some_and(|slot| slot.loaded)
    }

    /// The signed-in user with their backend-loaded record for `category`,
    /// read under one lock. `None` when signed out or never loaded.
    #[must_use]
    pub fn loaded_progress(&self, category: Category) -> Option<(User, ProgressRecord)> {
        let state = self.read();
        let user = state.user.clone()?;
        let slot = state.progress.get(&category).filter(|slot| slot.loaded)?;
        Some((user, slot.record.clone()))
    }

    /// Stamp `last_updated` on a cached record, only if `user` is still
    /// signed in and the record is still cached.
    pub fn touch_progress(&self, user: &UserId, category: Category, at: DateTime<Utc>) -> bool {
        let mut state = self.write();
        if state.user.as_ref().map(|u| &u.id) != Some(user) {
            return false;
        }
        match state.progress.get_mut(&category) {
            Some(slot) => {
                slot.record.touch(at);
                true
            }
            None => false,
        }
    }

    /// Cache a record. `loaded` marks it as reflecting the backend.
    pub fn store_progress(&self, record: ProgressRecord, loaded: bool) {
        let mut state = self.write();
        let category = record.category();
        let loaded = loaded
            || state
                .progress
                .get(&category)
                .is_some_and(|slot| slot.loaded);
        state
            .progress
            .insert(category, ProgressSlot { record, loaded });
    }

    /// Mutate the cached record in place and return the closure's result.
    pub fn update_progress<R>(
        &self,
        category: Category,
        f: impl FnOnce(&mut ProgressRecord) -> R,
    ) -> R {
        let mut state = self.write();
        let slot = state
            .progress
            .entry(category)
            .or_insert_with(|| ProgressSlot {
                record: ProgressRecord::new(category),
                loaded: false,
            });
        f(&mut slot.record)
    }

    /// Merge a partial update into the cached record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the patch does not fit the curriculum; the
    /// cached record is left untouched.
    pub fn merge_progress(
        &self,
        category: Category,
        patch: ProgressPatch,
    ) -> Result<(), ProgressError> {
        self.update_progress(category, |record| record.apply(patch))
    }

    /// Every cached record, in category order.
    #[must_use]
    pub fn all_progress(&self) -> Vec<ProgressRecord> {
        let state = self.read();
        Category::ALL
            .iter()
            .filter_map(|category| state.progress.get(category).map(|s| s.record.clone()))
            .collect()
    }
}
