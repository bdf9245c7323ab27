//! Shared fakes and builders for function tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use tokio::net::TcpListener;

use fnrelay_core::FunctionError;
use fnrelay_storage::{ContentStore, StoreError};

use crate::auth::{TokenVerifier, Verdict};

pub const BOUNDARY: &str = "----fnrelayTestBoundary7MA4YWxk";

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Builds `multipart/form-data` bodies with [`BOUNDARY`].
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn build(mut self) -> Bytes {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Bytes::from(self.body)
    }
}

/// A `width` x `height` PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Verifier with a canned answer.
pub enum FakeVerifier {
    Accept,
    Reject(Value),
    Unreachable,
}

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, _token: &str) -> Result<Verdict, FunctionError> {
        match self {
            Self::Accept => Ok(Verdict::Valid(serde_json::json!({"valid": true}))),
            Self::Reject(body) => Ok(Verdict::Invalid(body.clone())),
            Self::Unreachable => Err(FunctionError::DelegateCommunication(
                "expected value at line 1 column 1".into(),
            )),
        }
    }
}

/// Store that accepts `fail_after` uploads and rejects the rest.
pub struct FlakyStore {
    pub fail_after: usize,
    pub reject_thumbnails: bool,
    pub calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(fail_after: usize) -> Self {
        Self {
            fail_after,
            reject_thumbnails: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Accepts every primary upload and rejects every `thumbnail_*` file.
    pub fn rejecting_thumbnails() -> Self {
        Self {
            reject_thumbnails: true,
            ..Self::new(usize::MAX)
        }
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn create_file(
        &self,
        _bucket: &str,
        filename: &str,
        _content: Bytes,
    ) -> Result<String, StoreError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n >= self.fail_after || (self.reject_thumbnails && filename.starts_with("thumbnail_")) {
            return Err(StoreError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(format!("id-{n}-{filename}"))
    }
}
