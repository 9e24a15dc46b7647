use hub_core::model::{Category, Curriculum, OverallStats, ProgressRecord, User};
use services::SaveIndicator;

use crate::vm::time_fmt::format_last_updated;

/// One curriculum tile on the dashboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryCardVm {
    pub category: Category,
    pub title: String,
    pub route: &'static str,
    pub percent: u8,
    pub completed: usize,
    pub total: usize,
    pub last_updated_str: String,
}

impl CategoryCardVm {
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        let category = record.category();
        Self {
            category,
            title: Curriculum::for_category(category).title.to_string(),
            route: category.route_path(),
            percent: record.percent(),
            completed: record.completed_count(),
            total: record.total_days(),
            last_updated_str: format_last_updated(record.last_updated()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardVm {
    pub display_name: String,
    pub email: String,
    pub cohort: String,
    pub is_admin: bool,
    pub resume_url: Option<String>,
    pub cards: Vec<CategoryCardVm>,
    pub overall: OverallStats,
    pub saved: bool,
}

/// Cards follow `Category::ALL`; categories without a record show as fresh.
#[must_use]
pub fn map_dashboard(user: &User, records: &[ProgressRecord], indicator: SaveIndicator) -> DashboardVm {
    let cards = Category::ALL
        .iter()
        .map(|category| {
            records
                .iter()
                .find(|record| record.category() == *category)
                .map_or_else(
                    || CategoryCardVm::from_record(&ProgressRecord::new(*category)),
                    CategoryCardVm::from_record,
                )
        })
        .collect();
    DashboardVm {
        display_name: user.display_name().to_string(),
        email: user.email.clone(),
        cohort: user.cohort.clone(),
        is_admin: user.is_admin(),
        resume_url: user.resume_url.clone(),
        cards,
        overall: OverallStats::from_records(records),
        saved: indicator == SaveIndicator::Saved,
    }
}
