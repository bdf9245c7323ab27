/// Appwrite Storage adapter.
///
/// Creates files with `POST {endpoint}/storage/buckets/{bucket}/files`,
/// letting the server pick the ID (`fileId=unique()`).
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{check_status, ContentStore, StoreError};

pub struct AppwriteStore {
    client: Client,
    endpoint: String,
    project_id: String,
    api_key: String,
}

impl AppwriteStore {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_client(Client::new(), endpoint, project_id, api_key)
    }

    pub fn with_client(
        client: Client,
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct CreatedFile {
    #[serde(rename = "$id")]
    id: String,
}

#[async_trait]
impl ContentStore for AppwriteStore {
    fn name(&self) -> &str {
        "appwrite"
    }

    async fn create_file(
        &self,
        bucket: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<String, StoreError> {
        let size = content.len();
        let part = Part::bytes(content.to_vec())
            .file_name(filename.to_string())
            .mime_str(media::detect_mime_type(filename))?;
        let form = Form::new().text("fileId", "unique()").part("file", part);

        debug!(bucket, filename, size, "Creating Appwrite file");

        let response = self
            .client
            .post(format!("{}/storage/buckets/{}/files", self.endpoint, bucket))
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let created: CreatedFile = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        Ok(created.id)
    }
}
