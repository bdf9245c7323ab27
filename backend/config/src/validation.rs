//! Config validation: checks with per-path messages.
//!
//! Errors mean the config cannot be used at all. Warnings mean a function
//! lacks settings and will not be registered.

use crate::schema::{FunctionsConfig, StorageBackend};
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &FunctionsConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_auth(config, &mut report);
    validate_storage(config, &mut report);
    validate_upload(config, &mut report);
    validate_fleet(config, &mut report);
    validate_mail(config, &mut report);
    validate_relay(config, &mut report);
    report
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_auth(config: &FunctionsConfig, report: &mut ValidationReport) {
    let auth = &config.auth;
    match &auth.server_url {
        None => report.warn("auth.server_url", "SERVER_URL unset; upload_media is disabled"),
        Some(url) if !is_http_url(url) => {
            report.error("auth.server_url", format!("'{url}' is not an http(s) URL"))
        }
        Some(_) => {}
    }
    if auth.username.is_some() != auth.password.is_some() {
        report.warn(
            "auth.username",
            "Only one of AUTH_USERNAME / AUTH_PASSWORD is set; basic auth will be skipped",
        );
    }
    if auth.timeout_secs == 0 {
        report.error("auth.timeout_secs", "Timeout must be at least one second");
    }
}

fn validate_storage(config: &FunctionsConfig, report: &mut ValidationReport) {
    let storage = &config.storage;
    match storage.backend {
        StorageBackend::Appwrite => {
            if storage.bucket_id.is_none() {
                report.warn("storage.bucket_id", "BUCKET_ID unset; upload_media is disabled");
            }
            if storage.appwrite_project_id.is_none() || storage.appwrite_api_key.is_none() {
                report.warn(
                    "storage.appwrite_api_key",
                    "Appwrite project id or API key unset; upload_media is disabled",
                );
            }
            if !is_http_url(&storage.appwrite_endpoint) {
                report.error(
                    "storage.appwrite_endpoint",
                    format!("'{}' is not an http(s) URL", storage.appwrite_endpoint),
                );
            }
        }
        StorageBackend::Drive => {
            if storage.drive_access_token.is_none() {
                report.warn(
                    "storage.drive_access_token",
                    "GOOGLE_DRIVE_ACCESS_TOKEN unset; upload_media is disabled",
                );
            }
            if storage.container().is_none() {
                report.warn(
                    "storage.drive_folder",
                    "Neither GOOGLE_DRIVE_FOLDER nor BUCKET_ID set; upload_media is disabled",
                );
            }
        }
        StorageBackend::Memory => {
            report.warn("storage.backend", "In-memory storage keeps uploads only until exit");
        }
    }
}

fn validate_upload(config: &FunctionsConfig, report: &mut ValidationReport) {
    if config.upload.thumbnail_size == 0 {
        report.error("upload.thumbnail_size", "Thumbnail size must be positive");
    }
}

fn validate_fleet(config: &FunctionsConfig, report: &mut ValidationReport) {
    let fleet = &config.fleet;
    if !is_http_url(&fleet.registry_url) {
        report.error(
            "fleet.registry_url",
            format!("'{}' is not an http(s) URL", fleet.registry_url),
        );
    }
    if fleet.secret_key.is_none() {
        report.warn(
            "fleet.secret_key",
            "SECRET_KEY unset; health_check and update_servers are disabled",
        );
    }
    if fleet.ping_timeout_secs == 0 {
        report.error("fleet.ping_timeout_secs", "Timeout must be at least one second");
    }
}

fn validate_mail(config: &FunctionsConfig, report: &mut ValidationReport) {
    let mail = &config.mail;
    if mail.smtp_email.is_none() || mail.smtp_password.is_none() {
        report.warn(
            "mail.smtp_email",
            "SMTP_EMAIL or SMTP_PASSWORD unset; send_email is disabled",
        );
    }
    if mail.smtp_port == 0 {
        report.error("mail.smtp_port", "Port must be non-zero");
    }
}

fn validate_relay(config: &FunctionsConfig, report: &mut ValidationReport) {
    let relay = &config.relay;
    if !relay.dev_mode && relay.host.is_none() {
        report.warn("relay.host", "host unset and env != dev; upload relay is disabled");
    }
}
