use base64::Engine;
use bytes::Bytes;
use futures::stream;
use memchr::memmem;
use multer::Multipart;
use tracing::{debug, trace};

use crate::{FilePart, FormData};

/// Decode a fully buffered multipart body.
///
/// `content_type` is the request's `Content-Type` header; its `boundary`
/// parameter delimits the parts. Parts with a non-empty `filename` land in
/// [`FormData::files`] under their field name, in arrival order. Other named
/// `form-data` parts become text fields (lossy UTF-8; a repeated name keeps
/// the last value). Anything else is skipped.
///
/// A body that is not `multipart/form-data` decodes to an empty `FormData`.
/// A body the parser gives up on keeps the parts decoded before the error.
pub async fn decode(body: Bytes, content_type: &str) -> FormData {
    let mut form = FormData::default();

    let boundary = match multer::parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(e) => {
            debug!(content_type, error = %e, "Not a multipart body; nothing to decode");
            return form;
        }
    };

    let mut chunks = vec![Ok::<_, std::io::Error>(body.clone())];
    if let Some(close) = missing_close_delimiter(&body, &boundary) {
        trace!("Body has no close delimiter; ending the last part at end of body");
        chunks.push(Ok(close));
    }
    let mut multipart = Multipart::new(stream::iter(chunks), boundary);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Malformed multipart body; keeping parts decoded so far");
                break;
            }
        };

        let headers = field.headers();
        let is_form_data = headers
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("form-data"));
        let is_base64 = headers
            .get("content-transfer-encoding")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"));
        let name = field.name().filter(|n| !n.is_empty()).map(str::to_string);
        let filename = field
            .file_name()
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        let content = match field.bytes().await {
            Ok(content) => content,
            Err(e) => {
                debug!(error = %e, "Truncated multipart part; keeping parts decoded so far");
                break;
            }
        };

        if !is_form_data {
            trace!("Skipping part that is not form-data");
            continue;
        }
        let Some(name) = name else {
            trace!("Skipping unnamed part");
            continue;
        };
        let content = if is_base64 {
            decode_base64(content)
        } else {
            content
        };

        match filename {
            Some(filename) => {
                debug!(field = %name, filename = %filename, size = content.len(), "Decoded file part");
                form.files.entry(name.clone()).or_default().push(FilePart {
                    field: name,
                    filename,
                    content,
                });
            }
            None => {
                form.fields
                    .insert(name, String::from_utf8_lossy(&content).into_owned());
            }
        }
    }

    form
}

/// Undo `Content-Transfer-Encoding: base64`; undecodable payloads are kept.
fn decode_base64(payload: Bytes) -> Bytes {
    let compact: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    match base64::engine::general_purpose::STANDARD.decode(compact) {
        Ok(decoded) => Bytes::from(decoded),
        Err(e) => {
            debug!(error = %e, "Invalid base64 payload; keeping raw bytes");
            payload
        }
    }
}

/// Close delimiter to append when the body never closes its last part.
fn missing_close_delimiter(body: &[u8], boundary: &str) -> Option<Bytes> {
    let close = format!("--{boundary}--");
    if memmem::find(body, close.as_bytes()).is_some() {
        return None;
    }
    let lead = if body.ends_with(b"\n") { "" } else { "\r\n" };
    Some(Bytes::from(format!("{lead}{close}\r\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----fnrelayBoundary42";

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    enum Part<'a> {
        Field(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn build(parts: &[Part<'_>]) -> Bytes {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Field(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, filename, content) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(content);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Bytes::from(body)
    }

    #[tokio::test]
    async fn recovers_fields_and_files_byte_for_byte() {
        let first: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let second = b"\r\n--not-the-boundary\r\n\x00\xff trailing\r\n".to_vec();
        let body = build(&[
            Part::Field("authToken", "tok-123"),
            Part::File("media", "a.bin", &first),
            Part::File("media", "b.txt", &second),
        ]);

        let form = decode(body, &content_type()).await;

        assert_eq!(form.field("authToken"), Some("tok-123"));
        let files = form.files("media");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "a.bin");
        assert_eq!(files[0].content.as_ref(), first.as_slice());
        assert_eq!(files[1].filename, "b.txt");
        assert_eq!(files[1].content.as_ref(), second.as_slice());
        assert_eq!(files[1].field, "media");
    }

    #[tokio::test]
    async fn non_multipart_is_empty() {
        let body = Bytes::from_static(br#"{"authToken":"x"}"#);
        assert!(decode(body.clone(), "application/json").await.is_empty());
        assert!(decode(body, "multipart/form-data").await.is_empty());
    }

    #[tokio::test]
    async fn body_without_delimiters_is_empty() {
        let body = Bytes::from_static(b"just some text");
        assert!(decode(body, &content_type()).await.is_empty());
    }

    #[tokio::test]
    async fn empty_filename_is_a_field() {
        let body = build(&[Part::File("media", "", b"")]);
        let form = decode(body, &content_type()).await;
        assert!(form.files("media").is_empty());
        assert_eq!(form.field("media"), Some(""));
    }

    #[tokio::test]
    async fn last_field_value_wins() {
        let body = build(&[Part::Field("k", "one"), Part::Field("k", "two")]);
        assert_eq!(decode(body, &content_type()).await.field("k"), Some("two"));
    }

    #[tokio::test]
    async fn ignores_epilogue() {
        let mut raw = build(&[Part::Field("k", "v")]).to_vec();
        raw.extend_from_slice(b"epilogue text\r\n");
        let form = decode(Bytes::from(raw), &content_type()).await;
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.field("k"), Some("v"));
    }

    #[tokio::test]
    async fn missing_close_delimiter_ends_at_eof() {
        let raw = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"k\"\r\n\r\nvalue\r\n"
        );
        let form = decode(Bytes::from(raw), &content_type()).await;
        assert_eq!(form.field("a"), Some("1"));
        assert_eq!(form.field("k"), Some("value"));

        let unterminated = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"k\"\r\n\r\nvalue"
        );
        let form = decode(Bytes::from(unterminated), &content_type()).await;
        assert_eq!(form.field("k"), Some("value"));
    }

    #[tokio::test]
    async fn skips_parts_without_name_or_form_data() {
        let raw = format!(
            "--{BOUNDARY}\r\nContent-Disposition: attachment; name=\"a\"\r\n\r\n1\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data\r\n\r\n2\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n4\r\n\
             --{BOUNDARY}--\r\n"
        );
        let form = decode(Bytes::from(raw), &content_type()).await;
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.field("b"), Some("4"));
    }

    #[tokio::test]
    async fn decodes_base64_transfer_encoding() {
        let raw = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"media\"; filename=\"h.txt\"\r\n\
             Content-Transfer-Encoding: base64\r\n\r\naGVs\r\nbG8=\r\n--{BOUNDARY}--\r\n"
        );
        let form = decode(Bytes::from(raw), &content_type()).await;
        assert_eq!(form.files("media")[0].content.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn empty_part_payload() {
        let body = build(&[Part::File("media", "empty.bin", b"")]);
        let form = decode(body, &content_type()).await;
        assert_eq!(form.files("media")[0].size(), 0);
    }

    #[test]
    fn close_delimiter_only_when_absent() {
        let closed = build(&[Part::Field("k", "v")]);
        assert_eq!(missing_close_delimiter(&closed, BOUNDARY), None);
        assert_eq!(
            missing_close_delimiter(b"value", BOUNDARY),
            Some(Bytes::from(format!("\r\n--{BOUNDARY}--\r\n")))
        );
    }
}
