//! File fan-out: size ceiling, primary upload, thumbnail derivation.

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use fnrelay_core::FunctionError;
use fnrelay_multipart::FilePart;
use fnrelay_storage::ContentStore;
use media::ImageKind;

/// 15 MiB per file.
pub const MAX_FILE_SIZE: usize = 15 * 1024 * 1024;

/// A file that reached the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub id: String,
    pub filename: String,
    pub size: usize,
}

/// A file over the ceiling. Recorded, never uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OversizedReject {
    pub filename: String,
    pub size: usize,
}

#[derive(Debug, Default)]
pub struct FanOutReport {
    pub uploaded: Vec<UploadResult>,
    pub oversized: Vec<OversizedReject>,
}

impl FanOutReport {
    pub fn file_ids(&self) -> Vec<String> {
        self.uploaded.iter().map(|u| u.id.clone()).collect()
    }
}

/// Uploads decoded files one at a time into a single bucket.
pub struct FanOut<'a> {
    pub store: &'a dyn ContentStore,
    pub bucket: &'a str,
    pub thumbnail_size: u32,
    pub max_file_size: usize,
}

impl FanOut<'_> {
    /// Process `files` in order.
    ///
    /// Oversized files and thumbnail problems never stop later files. The
    /// first failed primary upload aborts with [`FunctionError::Storage`],
    /// reporting the IDs stored before it.
    pub async fn run(&self, files: Vec<FilePart>) -> Result<FanOutReport, FunctionError> {
        let mut report = FanOutReport::default();

        for file in files {
            let size = file.size();
            if size > self.max_file_size {
                warn!(filename = %file.filename, size, limit = self.max_file_size, "File over size limit, skipped");
                report.oversized.push(OversizedReject {
                    filename: file.filename,
                    size,
                });
                continue;
            }

            let id = self
                .store
                .create_file(self.bucket, &file.filename, file.content.clone())
                .await
                .map_err(|e| FunctionError::Storage {
                    filename: file.filename.clone(),
                    message: e.to_string(),
                    stored_ids: report.file_ids(),
                })?;
            info!(id = %id, filename = %file.filename, size, store = self.store.name(), "File stored");

            self.upload_thumbnail(&file.filename, file.content).await;

            report.uploaded.push(UploadResult {
                id,
                filename: file.filename,
                size,
            });
        }

        Ok(report)
    }

    /// Derive and store a thumbnail when `content` is an image. Failures are
    /// logged only.
    async fn upload_thumbnail(&self, filename: &str, content: Bytes) {
        let box_size = self.thumbnail_size;
        let derived = tokio::task::spawn_blocking(move || match media::classify(&content) {
            ImageKind::NotImage => Ok(None),
            ImageKind::Image { .. } => media::create_thumbnail(&content, box_size).map(Some),
        })
        .await;

        let thumbnail = match derived {
            Ok(Ok(Some(thumbnail))) => thumbnail,
            Ok(Ok(None)) => return,
            Ok(Err(e)) => {
                warn!(filename, error = %e, "Thumbnail creation failed");
                return;
            }
            Err(e) => {
                warn!(filename, error = %e, "Thumbnail task panicked");
                return;
            }
        };

        let name = media::thumbnail_name(filename);
        debug!(name = %name, width = thumbnail.width, height = thumbnail.height, "Uploading thumbnail");
        if let Err(e) = self
            .store
            .create_file(self.bucket, &name, Bytes::from(thumbnail.bytes))
            .await
        {
            warn!(name = %name, error = %e, "Thumbnail upload failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{png, FlakyStore};
    use fnrelay_storage::MemoryStore;

    fn part(filename: &str, content: Vec<u8>) -> FilePart {
        FilePart {
            field: "media".into(),
            filename: filename.into(),
            content: Bytes::from(content),
        }
    }

    fn fan_out<'a>(store: &'a dyn ContentStore, max: usize) -> FanOut<'a> {
        FanOut {
            store,
            bucket: "media",
            thumbnail_size: 300,
            max_file_size: max,
        }
    }

    #[tokio::test]
    async fn every_file_is_accounted_for() {
        let store = MemoryStore::new();
        let files = vec![
            part("a.bin", vec![0; 10]),
            part("big.bin", vec![0; 11]),
            part("c.bin", vec![0; 3]),
        ];

        let report = fan_out(&store, 10).run(files).await.unwrap();

        assert_eq!(report.uploaded.len() + report.oversized.len(), 3);
        assert_eq!(
            report.oversized,
            vec![OversizedReject {
                filename: "big.bin".into(),
                size: 11
            }]
        );
        let names: Vec<_> = report.uploaded.iter().map(|u| u.filename.as_str()).collect();
        assert_eq!(names, ["a.bin", "c.bin"]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn image_gets_thumbnail_within_box() {
        let store = MemoryStore::new();
        let report = fan_out(&store, MAX_FILE_SIZE)
            .run(vec![part("wide.png", png(600, 200))])
            .await
            .unwrap();

        assert_eq!(report.uploaded.len(), 1);
        let objects = store.objects().await;
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1].filename, "thumbnail_wide.png");

        let thumb = image::load_from_memory(&objects[1].content).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (300, 100));
    }

    #[tokio::test]
    async fn corrupt_image_is_stored_without_thumbnail() {
        let store = MemoryStore::new();
        let mut bytes = png(40, 40);
        bytes.truncate(bytes.len() / 2);

        let report = fan_out(&store, MAX_FILE_SIZE)
            .run(vec![part("broken.png", bytes), part("next.txt", b"hi".to_vec())])
            .await
            .unwrap();

        assert_eq!(report.uploaded.len(), 2);
        let names: Vec<_> = store.objects().await.into_iter().map(|o| o.filename).collect();
        assert!(!names.iter().any(|n| n.starts_with("thumbnail_")));
    }

    #[tokio::test]
    async fn storage_failure_aborts_with_partial_ids() {
        let store = FlakyStore::new(1);
        let err = fan_out(&store, MAX_FILE_SIZE)
            .run(vec![part("a.txt", b"a".to_vec()), part("b.txt", b"b".to_vec())])
            .await
            .unwrap_err();

        match err {
            FunctionError::Storage {
                filename,
                stored_ids,
                ..
            } => {
                assert_eq!(filename, "b.txt");
                assert_eq!(stored_ids, vec!["id-0-a.txt".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejected_thumbnail_keeps_primary_result() {
        let store = FlakyStore::rejecting_thumbnails();
        let report = fan_out(&store, MAX_FILE_SIZE)
            .run(vec![part("photo.png", png(64, 64)), part("next.txt", b"hi".to_vec())])
            .await
            .unwrap();

        assert_eq!(report.file_ids(), ["id-0-photo.png", "id-2-next.txt"]);
        assert_eq!(store.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }
}
