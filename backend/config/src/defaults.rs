//! Default values applied when the environment leaves a setting unset.

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Timeout for the token verification call.
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_APPWRITE_ENDPOINT: &str = "https://cloud.appwrite.io/v1";

/// Bounding box (pixels, both axes) for upload thumbnails.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 300;

pub const DEFAULT_FLEET_REGISTRY_URL: &str = "https://cs1.caelium.co";
pub const DEFAULT_FLEET_PING_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

pub const DEFAULT_RELAY_DEV_DATA_PATH: &str = "/usr/local/server/src/function/src/data.json";
