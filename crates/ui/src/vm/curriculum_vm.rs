use hub_core::model::{Category, Curriculum, ProgressRecord, ProgressStats};
use services::SaveIndicator;

use crate::vm::time_fmt::format_last_updated;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayVm {
    pub index: usize,
    pub day: u8,
    pub title: &'static str,
    pub duration: &'static str,
    pub difficulty: u8,
    pub completed: bool,
    pub note: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelVm {
    pub label: &'static str,
    pub completed: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurriculumVm {
    pub category: Category,
    pub title: &'static str,
    pub cohort: String,
    pub percent: u8,
    pub completed: usize,
    pub remaining: usize,
    pub total: usize,
    pub avg_difficulty: String,
    pub levels: Vec<LevelVm>,
    pub days: Vec<DayVm>,
    pub last_updated_str: String,
    pub saved: bool,
    /// Viewer sees the admin link in the navigation.
    pub is_admin: bool,
}

#[must_use]
pub fn difficulty_label(level: u8) -> &'static str {
    match level {
        1 => "Beginner",
        2 => "Intermediate",
        _ => "Advanced",
    }
}

#[must_use]
pub fn map_curriculum(
    record: &ProgressRecord,
    indicator: SaveIndicator,
    is_admin: bool,
) -> CurriculumVm {
    let curriculum = Curriculum::for_category(record.category());
    let stats = ProgressStats::compute(record);
    let days = curriculum
        .days
        .iter()
        .enumerate()
        .map(|(index, day_spec)| DayVm {
            index,
            day: day_spec.day,
            title: day_spec.title,
            duration: day_spec.duration,
            difficulty: day_spec.difficulty,
            completed: record.is_completed(index),
            note: record.note(index).unwrap_or_default().to_string(),
        })
        .collect();
    CurriculumVm {
        category: record.category(),
        title: curriculum.title,
        cohort: record.cohort().to_string(),
        percent: stats.percent,
        completed: stats.completed,
        remaining: stats.remaining,
        total: stats.total,
        avg_difficulty: stats.avg_difficulty_label(),
        levels: stats
            .by_level
            .iter()
            .map(|level| LevelVm {
                label: difficulty_label(level.level),
                completed: level.completed,
                total: level.total,
            })
            .collect(),
        days,
        last_updated_str: format_last_updated(record.last_updated()),
        saved: indicator == SaveIndicator::Saved,
        is_admin,
    }
}
