use hub_core::model::Category;
use services::InternOverview;

use crate::vm::time_fmt::format_last_updated;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternRowVm {
    pub name: String,
    pub email: String,
    pub cohort: String,
    /// Percent per category, in column order.
    pub percents: Vec<u8>,
    pub overall_percent: u8,
    pub last_updated_str: String,
    pub resume_url: Option<String>,
}

impl From<&InternOverview> for InternRowVm {
    fn from(intern: &InternOverview) -> Self {
        Self {
            name: intern.user.display_name().to_string(),
            email: intern.user.email.clone(),
            cohort: intern.user.cohort.clone(),
            percents: intern.categories.iter().map(|(_, percent)| *percent).collect(),
            overall_percent: intern.overall.percent,
            last_updated_str: format_last_updated(intern.last_updated),
            resume_url: intern.user.resume_url.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminVm {
    pub columns: Vec<&'static str>,
    pub rows: Vec<InternRowVm>,
}

#[must_use]
pub fn map_admin(interns: &[InternOverview]) -> AdminVm {
    AdminVm {
        columns: Category::ALL.iter().map(|c| c.short_label()).collect(),
        rows: interns.iter().map(InternRowVm::from).collect(),
    }
}
