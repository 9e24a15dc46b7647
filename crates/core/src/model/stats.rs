use super::curriculum::Curriculum;
use super::progress::{ProgressRecord, percent_of};

/// Completion for one difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStat {
    pub level: u8,
    pub completed: usize,
    pub total: usize,
}

/// Aggregate figures shown on the performance panel of a curriculum.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
    pub percent: u8,
    /// Mean difficulty of completed days, one decimal; `None` until a day is done.
    pub avg_difficulty: Option<f32>,
    pub by_level: Vec<LevelStat>,
}

impl ProgressStats {
    #[must_use]
    pub fn compute(record: &ProgressRecord) -> Self {
        let curriculum = Curriculum::for_category(record.category());
        let completed = record.completed_count();
        let total = record.total_days();

        let done_difficulty: Vec<u8> = curriculum
            .days
            .iter()
            .enumerate()
            .filter(|(index, _)| record.is_completed(*index))
            .map(|(_, day)| day.difficulty)
            .collect();
        let avg_difficulty = if done_difficulty.is_empty() {
            None
        } else {
            let sum: u32 = done_difficulty.iter().map(|d| u32::from(*d)).sum();
            #[allow(clippy::cast_precision_loss)]
            let mean = sum as f32 / done_difficulty.len() as f32;
            Some((mean * 10.0).round() / 10.0)
        };

        let by_level = (1..=3)
            .map(|level| {
                let days = curriculum
                    .days
                    .iter()
                    .enumerate()
                    .filter(|(_, day)| day.difficulty == level);
                let (mut completed, mut total) = (0, 0);
                for (index, _) in days {
                    total += 1;
                    if record.is_completed(index) {
                        completed += 1;
                    }
                }
                LevelStat {
                    level,
                    completed,
                    total,
                }
            })
            .collect();

        Self {
            completed,
            total,
            remaining: total.saturating_sub(completed),
            percent: record.percent(),
            avg_difficulty,
            by_level,
        }
    }

    #[must_use]
    pub fn avg_difficulty_label(&self) -> String {
        self.avg_difficulty
            .map_or_else(|| "0".to_string(), |avg| format!("{avg:.1}"))
    }
}

/// Totals across every category the user has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverallStats {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl OverallStats {
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ProgressRecord>) -> Self {
        let (completed, total) = records.into_iter().fold((0, 0), |(done, all), record| {
            (done + record.completed_count(), all + record.total_days())
        });
        Self {
            completed,
            total,
            percent: percent_of(completed, total),
        }
    }
}
