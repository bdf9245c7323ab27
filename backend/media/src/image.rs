//! Image classification and thumbnailing.
//!
//! Both entry points are CPU-bound and synchronous; async callers should run
//! them on a blocking thread.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat, ImageReader};
use thiserror::Error;
use tracing::debug;

/// Bounding box used when the caller has no preference.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 150;

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Image { format: ImageFormat },
    NotImage,
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("unrecognized image format")]
    UnknownFormat,

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// A re-encoded thumbnail and the format it shares with its source.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Sniff the format from magic bytes and check that the header decodes.
///
/// Any failure means `NotImage`; nothing is propagated.
pub fn classify(bytes: &[u8]) -> ImageKind {
    let reader = match ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(reader) => reader,
        Err(_) => return ImageKind::NotImage,
    };
    let Some(format) = reader.format() else {
        return ImageKind::NotImage;
    };

    match reader.into_dimensions() {
        Ok((width, height)) if width > 0 && height > 0 => ImageKind::Image { format },
        Ok(_) => ImageKind::NotImage,
        Err(e) => {
            debug!(?format, error = %e, "Image header did not decode");
            ImageKind::NotImage
        }
    }
}

/// Shrink an image to fit within `max_size` x `max_size`, keeping its aspect
/// ratio, and re-encode it in the source format.
///
/// Images already inside the box keep their dimensions (no upscaling) but are
/// still re-encoded.
pub fn create_thumbnail(bytes: &[u8], max_size: u32) -> Result<Thumbnail, ThumbnailError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format().ok_or(ThumbnailError::UnknownFormat)?;
    let img = reader.decode()?;

    let (width, height) = img.dimensions();
    let thumb = if width <= max_size && height <= max_size {
        img
    } else {
        img.resize(max_size, max_size, FilterType::Lanczos3)
    };

    let mut out = Cursor::new(Vec::new());
    thumb.write_to(&mut out, format)?;
    let (width, height) = thumb.dimensions();

    Ok(Thumbnail {
        format,
        width,
        height,
        bytes: out.into_inner(),
    })
}

/// `thumbnail_<stem><ext>` for an uploaded file name.
///
/// The extension is everything from the last `.`, unless that dot starts the
/// name (`.hidden` has no extension).
pub fn thumbnail_name(filename: &str) -> String {
    let (stem, ext) = match filename.rfind('.') {
        Some(dot) if dot > 0 && !filename[..dot].ends_with(['/', '\\']) => filename.split_at(dot),
        _ => (filename, ""),
    };
    format!("thumbnail_{stem}{ext}")
}
