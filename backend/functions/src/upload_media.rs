//! `upload_media`: authenticated multipart upload with thumbnails.
//!
//! Gate, decode, verify, fan out, assemble. `/ping` and non-POST requests
//! short-circuit before any of it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use fnrelay_core::{Function, FunctionError, FunctionResponse, IncomingRequest};
use fnrelay_multipart::media_type;
use fnrelay_storage::ContentStore;

use crate::auth::{TokenVerifier, Verdict};
use crate::fanout::{FanOut, FanOutReport, MAX_FILE_SIZE};

const TOKEN_FIELD: &str = "authToken";
const MEDIA_FIELD: &str = "media";

pub struct UploadMedia {
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<dyn ContentStore>,
    bucket: String,
    thumbnail_size: u32,
    max_file_size: usize,
}

impl UploadMedia {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn ContentStore>,
        bucket: impl Into<String>,
        thumbnail_size: u32,
    ) -> Self {
        Self {
            verifier,
            store,
            bucket: bucket.into(),
            thumbnail_size,
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    async fn upload(&self, request: &IncomingRequest) -> Result<FunctionResponse, FunctionError> {
        let content_type = request.content_type().unwrap_or_default();
        if media_type(content_type) != "multipart/form-data" {
            return Err(FunctionError::client(
                "Content-Type must be multipart/form-data",
            ));
        }

        let mut form = fnrelay_multipart::decode(request.body().clone(), content_type).await;

        let token = form
            .field(TOKEN_FIELD)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FunctionError::client("Missing 'authToken' form field"))?;
        if let Verdict::Invalid(auth_response) = self.verifier.verify(token).await? {
            return Err(FunctionError::Unauthorized { auth_response });
        }

        let files = form.take_files(MEDIA_FIELD);
        if files.is_empty() {
            return Err(FunctionError::client(
                "No files uploaded under 'media' field",
            ));
        }

        let report = FanOut {
            store: self.store.as_ref(),
            bucket: &self.bucket,
            thumbnail_size: self.thumbnail_size,
            max_file_size: self.max_file_size,
        }
        .run(files)
        .await?;

        info!(
            uploaded = report.uploaded.len(),
            oversized = report.oversized.len(),
            "Upload finished"
        );
        Ok(FunctionResponse::ok_json(assemble(&report, self.max_file_size)))
    }
}

/// The 200 body for a finished fan-out.
fn assemble(report: &FanOutReport, max_file_size: usize) -> Value {
    let mut body = json!({
        "success": true,
        "message": format!("Successfully uploaded {} file(s)", report.uploaded.len()),
        "file_ids": report.file_ids(),
    });
    if !report.oversized.is_empty() {
        body["oversized_files"] = json!(report.oversized);
        body["warning"] = json!(format!(
            "{} file(s) exceeded the {} MB size limit and were not uploaded",
            report.oversized.len(),
            max_file_size / (1024 * 1024)
        ));
    }
    body
}

/// What a non-POST caller sent, reflected back.
fn echo(request: &IncomingRequest) -> FunctionResponse {
    let headers: Map<String, Value> = request
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    FunctionResponse::ok_json(json!({
        "data": request.body_text(),
        "method": request.method(),
        "path": request.path(),
        "headers": headers,
    }))
}

#[async_trait]
impl Function for UploadMedia {
    fn name(&self) -> &str {
        "upload_media"
    }

    #[instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    async fn handle(&self, request: IncomingRequest) -> FunctionResponse {
        if request.is_ping() {
            return FunctionResponse::pong();
        }
        if !request.is_post() {
            return echo(&request);
        }
        self.upload(&request)
            .await
            .unwrap_or_else(FunctionError::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{png, FakeVerifier, FlakyStore, MultipartBuilder};
    use fnrelay_storage::MemoryStore;

    fn function(verifier: FakeVerifier, store: Arc<dyn ContentStore>) -> UploadMedia {
        UploadMedia::new(Arc::new(verifier), store, "media", 300)
    }

    fn post(body: bytes::Bytes) -> IncomingRequest {
        IncomingRequest::new("POST", "/")
            .with_header("Content-Type", MultipartBuilder::content_type())
            .with_body(body)
    }

    #[tokio::test]
    async fn ping_on_any_method() {
        let f = function(FakeVerifier::Accept, Arc::new(MemoryStore::new()));
        for method in ["GET", "POST", "DELETE"] {
            let res = f.handle(IncomingRequest::new(method, "/ping")).await;
            assert_eq!(res.status, 200);
            assert_eq!(res.as_text(), Some("Pong"));
        }
    }

    #[tokio::test]
    async fn non_post_is_echoed() {
        let f = function(FakeVerifier::Accept, Arc::new(MemoryStore::new()));
        let res = f
            .handle(
                IncomingRequest::new("PUT", "/anything")
                    .with_header("X-Trace", "abc")
                    .with_body("hello"),
            )
            .await;
        let body = res.as_json().unwrap();
        assert_eq!(body["data"], "hello");
        assert_eq!(body["method"], "PUT");
        assert_eq!(body["path"], "/anything");
        assert_eq!(body["headers"]["x-trace"], "abc");
    }

    #[tokio::test]
    async fn json_content_type_is_rejected() {
        let f = function(FakeVerifier::Accept, Arc::new(MemoryStore::new()));
        let res = f
            .handle(
                IncomingRequest::new("POST", "/")
                    .with_header("Content-Type", "application/json")
                    .with_body("{}"),
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(
            res.as_json().unwrap()["error"],
            "Content-Type must be multipart/form-data"
        );
    }

    #[tokio::test]
    async fn missing_token_is_client_error() {
        let f = function(FakeVerifier::Accept, Arc::new(MemoryStore::new()));
        let body = MultipartBuilder::new().file("media", "a.txt", b"a").build();
        let res = f.handle(post(body)).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn rejected_token_echoes_delegate_payload() {
        let verdict = json!({"valid": false, "reason": "expired"});
        let store = Arc::new(MemoryStore::new());
        let f = function(FakeVerifier::Reject(verdict.clone()), store.clone());
        let body = MultipartBuilder::new()
            .field("authToken", "t0k")
            .file("media", "a.txt", b"a")
            .build();

        let res = f.handle(post(body)).await;

        assert_eq!(res.status, 401);
        let body = res.as_json().unwrap();
        assert_eq!(body["error"], "User is not valid or authentication failed");
        assert_eq!(body["auth_response"], verdict);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn unreachable_delegate_is_server_error() {
        let f = function(FakeVerifier::Unreachable, Arc::new(MemoryStore::new()));
        let body = MultipartBuilder::new()
            .field("authToken", "t0k")
            .file("media", "a.txt", b"a")
            .build();
        let res = f.handle(post(body)).await;
        assert_eq!(res.status, 500);
        assert!(res.as_json().unwrap()["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid response from auth server: "));
    }

    #[tokio::test]
    async fn no_media_files() {
        let f = function(FakeVerifier::Accept, Arc::new(MemoryStore::new()));
        let body = MultipartBuilder::new()
            .field("authToken", "t0k")
            .file("other", "a.txt", b"a")
            .build();
        let res = f.handle(post(body)).await;
        assert_eq!(res.status, 400);
        assert_eq!(
            res.as_json().unwrap()["error"],
            "No files uploaded under 'media' field"
        );
    }

    #[tokio::test]
    async fn oversized_file_is_reported_not_uploaded() {
        let store = Arc::new(MemoryStore::new());
        let f = function(FakeVerifier::Accept, store.clone());
        let big = vec![b'x'; 20 * 1024 * 1024];
        let body = MultipartBuilder::new()
            .field("authToken", "t0k")
            .file("media", "big.bin", &big)
            .file("media", "small.bin", &[7u8; 1024])
            .build();

        let res = f.handle(post(body)).await;

        assert_eq!(res.status, 200);
        let body = res.as_json().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["file_ids"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["oversized_files"],
            json!([{"filename": "big.bin", "size": 20971520}])
        );
        assert!(!body["warning"].as_str().unwrap().is_empty());

        let objects = store.objects().await;
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].filename, "small.bin");
    }

    #[tokio::test]
    async fn png_upload_adds_thumbnail() {
        let store = Arc::new(MemoryStore::new());
        let f = function(FakeVerifier::Accept, store.clone());
        let body = MultipartBuilder::new()
            .field("authToken", "t0k")
            .file("media", "photo.png", &png(64, 48))
            .build();

        let res = f.handle(post(body)).await;

        assert_eq!(res.status, 200);
        let body = res.as_json().unwrap();
        assert_eq!(body["file_ids"].as_array().unwrap().len(), 1);
        assert!(body.get("oversized_files").is_none());
        assert!(body.get("warning").is_none());

        let names: Vec<_> = store.objects().await.into_iter().map(|o| o.filename).collect();
        assert_eq!(names, ["photo.png", "thumbnail_photo.png"]);
        assert_eq!(body["file_ids"][0], store.objects().await[0].id);
    }

    #[tokio::test]
    async fn thumbnail_rejection_does_not_fail_the_upload() {
        let store = Arc::new(FlakyStore::rejecting_thumbnails());
        let f = function(FakeVerifier::Accept, store.clone());
        let body = MultipartBuilder::new()
            .field("authToken", "t0k")
            .file("media", "photo.png", &png(64, 48))
            .file("media", "notes.txt", b"after the image")
            .build();

        let res = f.handle(post(body)).await;

        assert_eq!(res.status, 200);
        let body = res.as_json().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["file_ids"], json!(["id-0-photo.png", "id-2-notes.txt"]));
        assert_eq!(body["message"], "Successfully uploaded 2 file(s)");
    }

    #[tokio::test]
    async fn storage_failure_is_bad_gateway() {
        let f = function(FakeVerifier::Accept, Arc::new(FlakyStore::new(1)));
        let body = MultipartBuilder::new()
            .field("authToken", "t0k")
            .file("media", "a.txt", b"a")
            .file("media", "b.txt", b"b")
            .build();

        let res = f.handle(post(body)).await;

        assert_eq!(res.status, 502);
        assert_eq!(res.as_json().unwrap()["file_ids"], json!(["id-0-a.txt"]));
    }
}
