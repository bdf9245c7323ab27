//! Image handling for uploaded media.
//!
//! - [`classify`] decides whether bytes are a decodable image
//! - [`create_thumbnail`] derives a bounded, same-format thumbnail
//! - [`detect_mime_type`] labels stored files by extension

pub mod image;
pub mod mime_detect;

pub use crate::image::{
    DEFAULT_THUMBNAIL_SIZE, ImageKind, Thumbnail, ThumbnailError, classify, create_thumbnail,
    thumbnail_name,
};
pub use mime_detect::detect_mime_type;
