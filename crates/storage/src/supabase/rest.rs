use async_trait::async_trait;
use hub_core::model::{Category, UserId};
use reqwest::Method;
use serde_json::json;

use super::{SupabaseBackend, check, read_json, transport};
use crate::repository::{
    EventRow, EventSink, InternOverviewRow, ProfileRepository, ProfileRow, ProgressRepository,
    ProgressRow, StorageError,
};

const PROFILE_COLUMNS: &str = "id,role,resume_url,full_name,email,cohort";
const PROFILE_FALLBACK_COLUMNS: &str = "id,role,email";
const OVERVIEW_COLUMNS: &str = "id,full_name,email,resume_url,role,cohort,intern_progress(*)";

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

impl SupabaseBackend {
    async fn select_profile(
        &self,
        id: &UserId,
        columns: &str,
    ) -> Result<Option<ProfileRow>, StorageError> {
        let response = self
            .request(Method::GET, "rest/v1/profiles")
            .await
            .query(&[("select", columns.to_string()), ("id", eq(id.as_str()))])
            .send()
            .await
            .map_err(transport)?;
        let rows: Vec<ProfileRow> = read_json(check(response).await?).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl ProgressRepository for SupabaseBackend {
    async fn upsert_progress(&self, row: &ProgressRow) -> Result<ProgressRow, StorageError> {
        let response = self
            .request(Method::POST, "rest/v1/intern_progress")
            .await
            .query(&[("on_conflict", "intern_id,category")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(transport)?;
        let stored: Vec<ProgressRow> = read_json(check(response).await?).await?;
        Ok(stored.into_iter().next().unwrap_or_else(|| row.clone()))
    }

    async fn select_progress(
        &self,
        intern_id: &UserId,
        category: Category,
    ) -> Result<Option<ProgressRow>, StorageError> {
        let response = self
            .request(Method::GET, "rest/v1/intern_progress")
            .await
            .query(&[
                ("select", "*".to_string()),
                ("intern_id", eq(intern_id.as_str())),
                ("category", eq(category.slug())),
            ])
            .send()
            .await
            .map_err(transport)?;
        let rows: Vec<ProgressRow> = read_json(check(response).await?).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl ProfileRepository for SupabaseBackend {
    async fn get_profile(&self, id: &UserId) -> Result<Option<ProfileRow>, StorageError> {
        match self.select_profile(id, PROFILE_COLUMNS).await {
            // Older schemas lack the optional columns; PostgREST answers 400.
            Err(StorageError::Rejected { status: 400, message }) => {
                tracing::warn!(%message, "full profile select rejected, retrying with base columns");
                self.select_profile(id, PROFILE_FALLBACK_COLUMNS).await
            }
            other => other,
        }
    }

    async fn list_interns_with_progress(&self) -> Result<Vec<InternOverviewRow>, StorageError> {
        let response = self
            .request(Method::GET, "rest/v1/profiles")
            .await
            .query(&[
                ("select", OVERVIEW_COLUMNS),
                ("role", "eq.intern"),
                ("order", "email.asc"),
            ])
            .send()
            .await
            .map_err(transport)?;
        read_json(check(response).await?).await
    }

    async fn set_resume_url(&self, id: &UserId, url: &str) -> Result<(), StorageError> {
        let response = self
            .request(Method::PATCH, "rest/v1/profiles")
            .await
            .query(&[("id", eq(id.as_str()))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "resume_url": url }))
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for SupabaseBackend {
    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), StorageError> {
        if rows.is_empty() {
            return Ok(());
        }
        let response = self
            .request(Method::POST, "rest/v1/page_events")
            .await
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }
}
