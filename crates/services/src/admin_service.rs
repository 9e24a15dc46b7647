use std::sync::Arc;

use chrono::{DateTime, Utc};
use hub_core::model::{Category, DEFAULT_COHORT, OverallStats, ProgressRecord, Role, User};
use storage::repository::{InternOverviewRow, ProfileRepository};

use crate::error::AdminError;
use crate::progress_service::record_from_row;

/// One intern row of the admin table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternOverview {
    pub user: User,
    /// Percent per category, in `Category::ALL` order; untouched categories are 0.
    pub categories: Vec<(Category, u8)>,
    pub overall: OverallStats,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AdminService {
    profiles: Arc<dyn ProfileRepository>,
}

impl AdminService {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    /// Every intern with their progress, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-admin viewers and
    /// `AdminError::Storage` if the backend query fails.
    pub async fn list_interns(&self, viewer: &User) -> Result<Vec<InternOverview>, AdminError> {
        if !viewer.is_admin() {
            return Err(AdminError::Forbidden);
        }
        let rows = self.profiles.list_interns_with_progress().await?;
        let mut interns: Vec<InternOverview> = rows.into_iter().map(overview_from_row).collect();
        interns.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(interns)
    }
}

fn overview_from_row(row: InternOverviewRow) -> InternOverview {
    let profile = row.profile;
    let mut user = User::new(profile.id, profile.email.unwrap_or_default())
        .with_role(Role::from_backend(profile.role.as_deref()));
    user.full_name = profile.full_name;
    user.cohort = profile
        .cohort
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COHORT.to_string());
    user.resume_url = profile.resume_url;

    let records: Vec<ProgressRecord> = row.progress.into_iter().map(record_from_row).collect();
    let categories = Category::ALL
        .iter()
        .map(|category| {
            let percent = records
                .iter()
                .find(|r| r.category() == *category)
                .map_or(0, ProgressRecord::percent);
            (*category, percent)
        })
        .collect();
    let last_updated = records.iter().filter_map(ProgressRecord::last_updated).max();
    let overall = OverallStats::from_records(&records);

    InternOverview {
        user,
        categories,
        overall,
        last_updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress_service::row_from_record;
    use hub_core::model::UserId;
    use hub_core::time::fixed_now;
    use storage::InMemoryBackend;
    use storage::repository::ProgressRepository;

    #[tokio::test]
    async fn admin_sees_per_category_percentages() {
        let backend = InMemoryBackend::new();
        let intern = backend.register("i@example.com", "pw", "intern").unwrap();
        let intern_user = User::new(intern.id.clone(), "i@example.com");
        let mut record = ProgressRecord::new(Category::VibeCoding);
        record.set_day(0, true).unwrap();
        record.set_day(1, true).unwrap();
        record.touch(fixed_now());
        backend
            .upsert_progress(&row_from_record(&intern_user, &record))
            .await
            .unwrap();

        let service = AdminService::new(Arc::new(backend));
        let admin = User::new(UserId::new("boss"), "boss@example.com").with_role(Role::Admin);
        let interns = service.list_interns(&admin).await.unwrap();

        assert_eq!(interns.len(), 1);
        let row = &interns[0];
        assert_eq!(
            row.categories,
            vec![
                (Category::N8n, 0),
                (Category::VibeCoding, 40),
                (Category::PromptEngineering, 0),
                (Category::AiTools, 0),
            ]
        );
        assert_eq!(row.overall.completed, 2);
        assert_eq!(row.last_updated, Some(fixed_now()));
    }

    #[tokio::test]
    async fn interns_cannot_list() {
        let service = AdminService::new(Arc::new(InMemoryBackend::new()));
        let viewer = User::new(UserId::new("i"), "i@example.com");
        assert!(matches!(
            service.list_interns(&viewer).await,
            Err(AdminError::Forbidden)
        ));
    }
}
