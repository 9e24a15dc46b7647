use std::path::Path;
use std::sync::Arc;

use hub_core::model::User;
use storage::repository::{FileStore, ProfileRepository};

use crate::error::ProfileError;
use crate::state_store::StateStore;

pub const RESUME_BUCKET: &str = "resumes";

#[derive(Clone)]
pub struct ProfileService {
    files: Arc<dyn FileStore>,
    profiles: Arc<dyn ProfileRepository>,
    state: StateStore,
}

impl ProfileService {
    #[must_use]
    pub fn new(
        files: Arc<dyn FileStore>,
        profiles: Arc<dyn ProfileRepository>,
        state: StateStore,
    ) -> Self {
        Self {
            files,
            profiles,
            state,
        }
    }

    /// Upload a resume to `resumes/{user}/resume.{ext}`, replacing any earlier
    /// one, and record its public URL on the profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyFile` for an empty upload and
    /// `ProfileError::Storage` if the upload or profile update fails.
    pub async fn upload_resume(
        &self,
        user: &User,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ProfileError> {
        if bytes.is_empty() {
            return Err(ProfileError::EmptyFile);
        }
        let ext = resume_extension(file_name);
        let path = format!("{}/resume.{ext}", user.id);
        let url = self
            .files
            .upload_file(RESUME_BUCKET, &path, bytes, content_type(&ext))
            .await?;
        self.profiles.set_resume_url(&user.id, &url).await?;

        if let Some(mut current) = self.state.current_user().filter(|u| u.id == user.id) {
            current.resume_url = Some(url.clone());
            self.state.set_user(Some(current));
        }
        tracing::info!(user = %user.id, %path, "resume uploaded");
        Ok(url)
    }
}

fn resume_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "pdf".to_string())
}

fn content_type(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
