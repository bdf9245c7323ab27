//! Typed configuration schema.
//!
//! One `FunctionsConfig` is built at process start and shared read-only by
//! every function. Secrets are plain `Option<String>` fields; use
//! [`crate::redact`] before logging a snapshot.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionsConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub auth: AuthDelegateConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub fleet: FleetConfig,
    pub mail: MailConfig,
    pub relay: RelayConfig,
}

/// Where the local gateway listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` does not parse.
    pub level: String,
    pub format: LogFormat,
    /// Directory for daily rolling NDJSON files. Console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
            dir: None,
        }
    }
}

/// The external token verification server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDelegateConfig {
    /// Base URL; the verify path is appended.
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AuthDelegateConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            username: None,
            password: None,
            timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Appwrite,
    Drive,
    /// In-process store, for local runs only.
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "appwrite" => Ok(Self::Appwrite),
            "drive" | "google_drive" | "gdrive" => Ok(Self::Drive),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Bucket for Appwrite; folder name fallback for Drive.
    pub bucket_id: Option<String>,
    pub appwrite_endpoint: String,
    pub appwrite_project_id: Option<String>,
    pub appwrite_api_key: Option<String>,
    pub drive_access_token: Option<String>,
    pub drive_folder: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket_id: None,
            appwrite_endpoint: DEFAULT_APPWRITE_ENDPOINT.to_string(),
            appwrite_project_id: None,
            appwrite_api_key: None,
            drive_access_token: None,
            drive_folder: None,
        }
    }
}

impl StorageConfig {
    /// The container name uploads go to: the Drive folder when set, else the bucket.
    pub fn container(&self) -> Option<&str> {
        match self.backend {
            StorageBackend::Drive => self.drive_folder.as_deref().or(self.bucket_id.as_deref()),
            _ => self.bucket_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub thumbnail_size: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

/// The server registry polled by `health_check` and `update_servers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub registry_url: String,
    pub secret_key: Option<String>,
    pub ping_timeout_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_FLEET_REGISTRY_URL.to_string(),
            secret_key: None,
            ping_timeout_secs: DEFAULT_FLEET_PING_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Login and sender address.
    pub smtp_email: Option<String>,
    pub smtp_password: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_email: None,
            smtp_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Backend host serving `/api/cloud/unprocessed/`.
    pub host: Option<String>,
    /// Serve `dev_data_path` instead of calling `host`.
    pub dev_mode: bool,
    pub dev_data_path: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: None,
            dev_mode: false,
            dev_data_path: PathBuf::from(DEFAULT_RELAY_DEV_DATA_PATH),
        }
    }
}
