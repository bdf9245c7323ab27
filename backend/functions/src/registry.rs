//! Name -> function lookup, built once from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use fnrelay_config::{FunctionsConfig, StorageBackend, StorageConfig};
use fnrelay_core::Function;
use fnrelay_storage::{AppwriteStore, ContentStore, DriveStore, MemoryStore};

use crate::{
    HealthCheck, HttpFleetApi, HttpTokenVerifier, SendEmail, SmtpMailer, UpdateServers,
    UploadMedia, UploadRelay,
};

/// Bucket name for the in-memory store when none is configured.
const LOCAL_BUCKET: &str = "local";

/// Content kept by the in-memory store before the oldest uploads are evicted.
const MEMORY_STORE_BYTES: usize = 256 * 1024 * 1024;

#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under [`Function::name`], replacing any earlier entry.
    pub fn register(&mut self, function: Arc<dyn Function>) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            warn!(function = %name, "Replaced an already registered function");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn content_store(config: &StorageConfig) -> Result<(Arc<dyn ContentStore>, String)> {
    match config.backend {
        StorageBackend::Appwrite => {
            let bucket = config.container().context("BUCKET_ID is not configured")?;
            let project = config
                .appwrite_project_id
                .as_deref()
                .context("APPWRITE_FUNCTION_PROJECT_ID is not configured")?;
            let key = config
                .appwrite_api_key
                .as_deref()
                .context("APPWRITE_API_KEY is not configured")?;
            let store = AppwriteStore::new(&config.appwrite_endpoint, project, key);
            Ok((Arc::new(store), bucket.to_string()))
        }
        StorageBackend::Drive => {
            let folder = config
                .container()
                .context("GOOGLE_DRIVE_FOLDER is not configured")?;
            let token = config
                .drive_access_token
                .as_deref()
                .context("GOOGLE_DRIVE_ACCESS_TOKEN is not configured")?;
            Ok((Arc::new(DriveStore::new(token)), folder.to_string()))
        }
        StorageBackend::Memory => {
            let bucket = config.container().unwrap_or(LOCAL_BUCKET);
            warn!(
                limit_bytes = MEMORY_STORE_BYTES,
                "Memory storage keeps uploads in process memory only; oldest uploads are evicted past the limit"
            );
            Ok((
                Arc::new(MemoryStore::with_byte_limit(MEMORY_STORE_BYTES)),
                bucket.to_string(),
            ))
        }
    }
}

fn upload_media(config: &FunctionsConfig) -> Result<Arc<dyn Function>> {
    let verifier = HttpTokenVerifier::new(&config.auth)?;
    let (store, bucket) = content_store(&config.storage)?;
    info!(store = store.name(), bucket = %bucket, "upload_media storage ready");
    Ok(Arc::new(UploadMedia::new(
        Arc::new(verifier),
        store,
        bucket,
        config.upload.thumbnail_size,
    )))
}

/// Build every function whose settings are complete.
///
/// Functions with missing settings are skipped with a warning; the rest of
/// the registry still comes up.
pub fn build_registry(config: &FunctionsConfig) -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();

    let mut add = |name: &str, built: Result<Arc<dyn Function>>| match built {
        Ok(function) => registry.register(function),
        Err(e) => warn!(function = name, reason = %format!("{e:#}"), "Function disabled"),
    };

    add("upload_media", upload_media(config));
    add(
        "upload",
        UploadRelay::from_config(&config.relay).map(|f| Arc::new(f) as Arc<dyn Function>),
    );
    add(
        "send_email",
        SmtpMailer::new(&config.mail)
            .map(|mailer| Arc::new(SendEmail::new(Arc::new(mailer))) as Arc<dyn Function>),
    );
    match HttpFleetApi::new(&config.fleet) {
        Ok(fleet) => {
            let fleet = Arc::new(fleet);
            add("health_check", Ok(Arc::new(HealthCheck::new(fleet.clone()))));
            add("update_servers", Ok(Arc::new(UpdateServers::new(fleet))));
        }
        Err(e) => {
            let reason = format!("{e:#}");
            warn!(function = "health_check", reason = %reason, "Function disabled");
            warn!(function = "update_servers", reason = %reason, "Function disabled");
        }
    }

    info!(functions = ?registry.names(), "Function registry built");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> FunctionsConfig {
        let mut config = FunctionsConfig::default();
        config.auth.server_url = Some("http://auth.local".into());
        config.storage.backend = StorageBackend::Memory;
        config
    }

    #[test]
    fn empty_config_registers_nothing() {
        let registry = build_registry(&FunctionsConfig::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn registers_configured_functions() {
        let mut config = memory_config();
        config.fleet.secret_key = Some("s".into());
        config.relay.host = Some("http://backend.local".into());

        let registry = build_registry(&config);

        assert_eq!(
            registry.names(),
            ["health_check", "update_servers", "upload", "upload_media"]
        );
        assert!(registry.get("send_email").is_none());
    }

    #[test]
    fn appwrite_needs_credentials() {
        let mut config = memory_config();
        config.storage.backend = StorageBackend::Appwrite;
        config.storage.bucket_id = Some("media".into());
        assert!(build_registry(&config).get("upload_media").is_none());

        config.storage.appwrite_project_id = Some("p".into());
        config.storage.appwrite_api_key = Some("k".into());
        assert!(build_registry(&config).get("upload_media").is_some());
    }

    #[test]
    fn drive_uses_configured_folder() {
        let mut config = FunctionsConfig::default();
        config.storage.backend = StorageBackend::Drive;
        config.storage.drive_access_token = Some("ya29".into());
        config.storage.drive_folder = Some("uploads".into());

        let (store, bucket) = content_store(&config.storage).unwrap();
        assert_eq!(store.name(), "google_drive");
        assert_eq!(bucket, "uploads");
    }
}
