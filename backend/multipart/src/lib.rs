//! Multipart/form-data decoding for fully buffered request bodies.
//!
//! [`decode`] splits a body into text fields and file parts with `multer`.
//! It never fails: input it cannot make sense of yields an empty or partial
//! [`FormData`], and checking that the expected fields are present is left to
//! the caller.

mod decoder;

use std::collections::HashMap;

use bytes::Bytes;

pub use decoder::decode;

/// The media type of a `Content-Type` value, lowercased, without parameters.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// A file uploaded under some form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Owning form field, e.g. "media".
    pub field: String,
    /// Client-supplied name. Untrusted.
    pub filename: String,
    pub content: Bytes,
}

impl FilePart {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Decoded form: text fields by name, files grouped by field in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Vec<FilePart>>,
}

impl FormData {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Files under `name`, empty when none were sent.
    pub fn files(&self, name: &str) -> &[FilePart] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take_files(&mut self, name: &str) -> Vec<FilePart> {
        self.files.remove(name).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }
}
