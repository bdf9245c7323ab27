//! MIME type detection for uploaded files.
//!
//! Used by storage backends to label stored files.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "svg"          => "image/svg+xml",
        "avif"         => "image/avif",
        "bmp"          => "image/bmp",
        "ico"          => "image/x-icon",
        "tiff" | "tif" => "image/tiff",
        "heic"         => "image/heic",

        // Audio
        "mp3"          => "audio/mpeg",
        "ogg"          => "audio/ogg",
        "wav"          => "audio/wav",
        "m4a"          => "audio/mp4",

        // Video
        "mp4"          => "video/mp4",
        "webm"         => "video/webm",
        "mov"          => "video/quicktime",

        // Documents
        "pdf"          => "application/pdf",
        "txt"          => "text/plain",
        "json"         => "application/json",
        "csv"          => "text/csv",
        "zip"          => "application/zip",

        _              => "application/octet-stream",
    }
}
