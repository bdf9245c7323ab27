/// In-process content store.
///
/// Keeps objects in memory until the process exits. Backs local runs
/// (`STORAGE_BACKEND=memory`) and tests. With a byte limit the oldest objects
/// are evicted once the stored content outgrows it.
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{ContentStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: String,
    pub bucket: String,
    pub filename: String,
    pub content: Bytes,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<Vec<StoredObject>>>,
    byte_limit: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `byte_limit` bytes of content. The newest object is
    /// always kept, even when it alone exceeds the limit.
    pub fn with_byte_limit(byte_limit: usize) -> Self {
        Self {
            byte_limit: Some(byte_limit),
            ..Self::default()
        }
    }

    /// Snapshot of stored objects in write order.
    pub async fn objects(&self) -> Vec<StoredObject> {
        self.objects.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_file(
        &self,
        bucket: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        debug!(id = %id, bucket, filename, size = content.len(), "Storing object in memory");
        let mut objects = self.objects.write().await;
        objects.push(StoredObject {
            id: id.clone(),
            bucket: bucket.to_string(),
            filename: filename.to_string(),
            content,
        });

        if let Some(limit) = self.byte_limit {
            let mut total: usize = objects.iter().map(|o| o.content.len()).sum();
            while total > limit && objects.len() > 1 {
                let evicted = objects.remove(0);
                total -= evicted.content.len();
                warn!(id = %evicted.id, filename = %evicted.filename, limit, "Memory store full, evicted oldest object");
            }
        }
        Ok(id)
    }
}
