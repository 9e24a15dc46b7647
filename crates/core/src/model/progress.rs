use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use super::category::Category;
use super::curriculum::Curriculum;
use super::user::DEFAULT_COHORT;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("day index {index} is out of range for {category} ({total} days)")]
    DayOutOfRange {
        category: Category,
        index: usize,
        total: usize,
    },

    #[error("expected {expected} completion flags, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// `round(100 * completed / total)`, rounding halves up; zero when `total` is zero.
#[must_use]
pub fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Partial update merged into an existing record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    pub completed_tasks: Option<Vec<bool>>,
    pub task_notes: Option<BTreeMap<usize, String>>,
    pub cohort: Option<String>,
}

/// Completion state of one user for one category.
///
/// The percentage is derived from the flags and recomputed on every
/// mutation; there is no way to set it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    category: Category,
    completed: Vec<bool>,
    notes: BTreeMap<usize, String>,
    percent: u8,
    cohort: String,
    last_updated: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// A record with every day pending.
    #[must_use]
    pub fn new(category: Category) -> Self {
        let total = Curriculum::for_category(category).total_days();
        Self {
            category,
            completed: vec![false; total],
            notes: BTreeMap::new(),
            percent: 0,
            cohort: DEFAULT_COHORT.to_string(),
            last_updated: None,
        }
    }

    /// Rehydrate from stored values.
    ///
    /// Flag vectors of the wrong length are padded with `false` or
    /// truncated, notes outside the curriculum are dropped, and the stored
    /// percentage is ignored in favour of a fresh computation.
    #[must_use]
    pub fn from_persisted(
        category: Category,
        mut completed: Vec<bool>,
        notes: BTreeMap<usize, String>,
        cohort: Option<String>,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        let total = Curriculum::for_category(category).total_days();
        completed.resize(total, false);
        let notes = notes
            .into_iter()
            .filter(|(index, text)| *index < total && !text.is_empty())
            .collect();
        let mut record = Self {
            category,
            completed,
            notes,
            percent: 0,
            cohort: cohort
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COHORT.to_string()),
            last_updated,
        };
        record.recompute();
        record
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn completed_tasks(&self) -> &[bool] {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, index: usize) -> bool {
        self.completed.get(index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn task_notes(&self) -> &BTreeMap<usize, String> {
        &self.notes
    }

    #[must_use]
    pub fn note(&self, index: usize) -> Option<&str> {
        self.notes.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[must_use]
    pub fn cohort(&self) -> &str {
        &self.cohort
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.iter().filter(|done| **done).count()
    }

    #[must_use]
    pub fn total_days(&self) -> usize {
        self.completed.len()
    }

    /// Mark one day as done or pending.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::DayOutOfRange` for an index past the curriculum.
    pub fn set_day(&mut self, index: usize, done: bool) -> Result<(), ProgressError> {
        let total = self.total_days();
        let slot = self
            .completed
            .get_mut(index)
            .ok_or(ProgressError::DayOutOfRange {
                category: self.category,
                index,
                total,
            })?;
        *slot = done;
        self.recompute();
        Ok(())
    }

    /// Flip one day and return its new state.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::DayOutOfRange` for an index past the curriculum.
    pub fn toggle_day(&mut self, index: usize) -> Result<bool, ProgressError> {
        let next = !self.is_completed(index);
        self.set_day(index, next)?;
        Ok(next)
    }

    /// Replace the note for a day; an empty text removes it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::DayOutOfRange` for an index past the curriculum.
    pub fn set_note(&mut self, index: usize, text: impl Into<String>) -> Result<(), ProgressError> {
        self.check_index(index)?;
        let text = text.into();
        if text.is_empty() {
            self.notes.remove(&index);
        } else {
            self.notes.insert(index, text);
        }
        Ok(())
    }

    pub fn set_cohort(&mut self, cohort: impl Into<String>) {
        self.cohort = cohort.into();
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }

    /// Merge a partial update. Nothing is applied when any part is invalid.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::LengthMismatch` for a flag vector of the wrong
    /// length and `ProgressError::DayOutOfRange` for notes past the curriculum.
    pub fn apply(&mut self, patch: ProgressPatch) -> Result<(), ProgressError> {
        if let Some(flags) = &patch.completed_tasks {
            if flags.len() != self.total_days() {
                return Err(ProgressError::LengthMismatch {
                    expected: self.total_days(),
                    actual: flags.len(),
                });
            }
        }
        if let Some(notes) = &patch.task_notes {
            for index in notes.keys() {
                self.check_index(*index)?;
            }
        }

        if let Some(flags) = patch.completed_tasks {
            self.completed = flags;
        }
        if let Some(notes) = patch.task_notes {
            for (index, text) in notes {
                if text.is_empty() {
                    self.notes.remove(&index);
                } else {
                    self.notes.insert(index, text);
                }
            }
        }
        if let Some(cohort) = patch.cohort {
            self.cohort = cohort;
        }
        self.recompute();
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), ProgressError> {
        if index < self.total_days() {
            Ok(())
        } else {
            Err(ProgressError::DayOutOfRange {
                category: self.category,
                index,
                total: self.total_days(),
            })
        }
    }

    fn recompute(&mut self) {
        self.percent = percent_of(self.completed_count(), self.total_days());
    }
}
