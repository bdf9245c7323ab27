//! `upload`: relays the backend's list of unprocessed uploads.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use fnrelay_config::RelayConfig;
use fnrelay_core::{Function, FunctionError, FunctionResponse, IncomingRequest};

enum Source {
    /// Local fixture file, for development.
    File(PathBuf),
    /// `GET {host}/api/cloud/unprocessed/`.
    Remote { client: Client, url: String },
}

pub struct UploadRelay {
    source: Source,
}

impl UploadRelay {
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        if config.dev_mode {
            return Ok(Self::from_file(config.dev_data_path.clone()));
        }
        let host = config.host.as_deref().context("host is not configured")?;
        Ok(Self::from_host(host))
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    pub fn from_host(host: &str) -> Self {
        Self {
            source: Source::Remote {
                client: Client::new(),
                url: format!("{}/api/cloud/unprocessed/", host.trim_end_matches('/')),
            },
        }
    }

    async fn fetch(&self) -> Result<String> {
        match &self.source {
            Source::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
            Source::Remote { client, url } => {
                debug!(url = %url, "Fetching unprocessed uploads");
                client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("GET {url} failed"))?
                    .text()
                    .await
                    .context("Failed to read relay response")
            }
        }
    }
}

#[async_trait]
impl Function for UploadRelay {
    fn name(&self) -> &str {
        "upload"
    }

    #[instrument(skip_all, fields(path = %request.path()))]
    async fn handle(&self, request: IncomingRequest) -> FunctionResponse {
        if request.is_ping() {
            return FunctionResponse::pong();
        }
        match self.fetch().await {
            Ok(text) => FunctionResponse::text(200, text),
            Err(e) => FunctionError::Upstream(format!("{e:#}")).into_response(),
        }
    }
}
