use async_trait::async_trait;
use reqwest::Method;

use super::{SupabaseBackend, check, transport};
use crate::repository::{FileStore, StorageError};

#[async_trait]
impl FileStore for SupabaseBackend {
    async fn upload_file(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let object = format!("{bucket}/{}", path.trim_start_matches('/'));
        let response = self
            .request(Method::POST, &format!("storage/v1/object/{object}"))
            .await
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(self.endpoint(&format!("storage/v1/object/public/{object}")))
    }
}
