/// Google Drive adapter.
///
/// The "bucket" is a folder name. Each upload finds (or creates) that folder,
/// uploads the raw bytes, then names the new file and moves it into the
/// folder. Authenticates with a caller-provided OAuth access token.
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{check_status, ContentStore, StoreError};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

pub struct DriveStore {
    client: Client,
    access_token: String,
    api_base: String,
    upload_base: String,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

impl DriveStore {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
        }
    }

    /// Point at a different Drive deployment (or a local stub).
    pub fn with_base_urls(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, StoreError> {
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    /// ID of the folder called `name`, creating it when missing.
    async fn ensure_folder(&self, name: &str) -> Result<String, StoreError> {
        let query = format!(
            "name = '{}' and mimeType = '{FOLDER_MIME}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&self.access_token)
            .query(&[("q", query.as_str()), ("fields", "files(id)")])
            .send()
            .await?;
        let existing: FileList = Self::parse(response).await?;
        if let Some(folder) = existing.files.into_iter().next() {
            return Ok(folder.id);
        }

        info!(folder = name, "Creating Drive folder");
        let response = self
            .client
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME }))
            .send()
            .await?;
        let created: DriveFile = Self::parse(response).await?;
        Ok(created.id)
    }
}

#[async_trait]
impl ContentStore for DriveStore {
    fn name(&self) -> &str {
        "google_drive"
    }

    async fn create_file(
        &self,
        bucket: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<String, StoreError> {
        let folder_id = self.ensure_folder(bucket).await?;
        debug!(folder_id = %folder_id, filename, size = content.len(), "Uploading to Drive");

        let response = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "media")])
            .header("Content-Type", media::detect_mime_type(filename))
            .body(content)
            .send()
            .await?;
        let uploaded: DriveFile = Self::parse(response).await?;

        let response = self
            .client
            .patch(format!("{}/files/{}", self.api_base, uploaded.id))
            .bearer_auth(&self.access_token)
            .query(&[("addParents", folder_id.as_str())])
            .json(&json!({ "name": filename }))
            .send()
            .await?;
        check_status(response).await?;

        Ok(uploaded.id)
    }
}
