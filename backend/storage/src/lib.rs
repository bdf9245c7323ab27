//! Content stores: where uploaded files end up.
//!
//! Every backend implements [`ContentStore`]; functions receive one as an
//! injected `Arc<dyn ContentStore>` and never build clients themselves.

pub mod appwrite;
pub mod drive;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use appwrite::AppwriteStore;
pub use drive::DriveStore;
pub use memory::{MemoryStore, StoredObject};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to content store failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("content store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected content store response: {0}")]
    InvalidResponse(String),
}

/// A place files can be written to.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Backend name for logs, e.g. "appwrite".
    fn name(&self) -> &str;

    /// Store `content` as `filename` inside `bucket` and return the
    /// store-assigned unique ID.
    async fn create_file(
        &self,
        bucket: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<String, StoreError>;
}

/// Turn a non-success response into [`StoreError::Rejected`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}
