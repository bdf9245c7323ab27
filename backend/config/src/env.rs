//! Building a [`FunctionsConfig`] from environment variables.
//!
//! The process environment is read exactly once, in [`FunctionsConfig::from_env`].
//! Everything else works on a plain map so tests never touch global state.
//! Empty values count as unset.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::schema::{FunctionsConfig, LogFormat, StorageBackend};

/// Error returned when an environment variable holds an unusable value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
}

struct EnvSource<'a> {
    vars: &'a HashMap<String, String>,
}

impl<'a> EnvSource<'a> {
    fn string(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn parsed<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.string(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    var: name.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }),
        }
    }
}

impl FunctionsConfig {
    /// Load configuration from the process environment with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build configuration from a provided variable map (useful for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let env = EnvSource { vars };
        let mut config = FunctionsConfig::default();

        if let Some(bind) = env.string("FUNCTIONS_BIND") {
            config.server.bind_address = bind;
        }
        if let Some(port) = env.parsed::<u16>("FUNCTIONS_PORT")? {
            config.server.port = port;
        }

        if let Some(level) = env.string("RUST_LOG") {
            config.log.level = level;
        }
        if let Some(format) = env.string("FUNCTIONS_LOG_FORMAT") {
            config.log.format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                other => {
                    return Err(ConfigError::InvalidValue {
                        var: "FUNCTIONS_LOG_FORMAT".into(),
                        value: other.into(),
                        reason: "expected 'json' or 'pretty'".into(),
                    })
                }
            };
        }
        config.log.dir = env.string("FUNCTIONS_LOG_DIR").map(PathBuf::from);

        config.auth.server_url = env.string("SERVER_URL");
        config.auth.username = env.string("AUTH_USERNAME");
        config.auth.password = env.string("AUTH_PASSWORD");

        if let Some(backend) = env.parsed::<StorageBackend>("STORAGE_BACKEND")? {
            config.storage.backend = backend;
        }
        config.storage.bucket_id = env.string("BUCKET_ID");
        if let Some(endpoint) = env.string("APPWRITE_ENDPOINT") {
            config.storage.appwrite_endpoint = endpoint;
        }
        config.storage.appwrite_project_id = env.string("APPWRITE_FUNCTION_PROJECT_ID");
        config.storage.appwrite_api_key = env.string("APPWRITE_API_KEY");
        config.storage.drive_access_token = env.string("GOOGLE_DRIVE_ACCESS_TOKEN");
        config.storage.drive_folder = env.string("GOOGLE_DRIVE_FOLDER");

        if let Some(size) = env.parsed::<u32>("THUMBNAIL_SIZE")? {
            config.upload.thumbnail_size = size;
        }

        if let Some(url) = env.string("FLEET_REGISTRY_URL") {
            config.fleet.registry_url = url;
        }
        config.fleet.secret_key = env.string("SECRET_KEY");

        if let Some(host) = env.string("SMTP_HOST") {
            config.mail.smtp_host = host;
        }
        if let Some(port) = env.parsed::<u16>("SMTP_PORT")? {
            config.mail.smtp_port = port;
        }
        config.mail.smtp_email = env.string("SMTP_EMAIL");
        config.mail.smtp_password = env.string("SMTP_PASSWORD");

        config.relay.host = env.string("host");
        config.relay.dev_mode = env.string("env").is_some_and(|v| v == "dev");
        if let Some(path) = env.string("RELAY_DEV_DATA_PATH") {
            config.relay.dev_data_path = PathBuf::from(path);
        }

        Ok(config)
    }
}
