//! `fnrelay-config`: runtime configuration for fnrelay functions.
//!
//! Provides:
//! - Typed config schema (server, logging, auth delegate, storage, fleet, mail, relay)
//! - Loading from environment variables, once, at process start
//! - Config redaction for safe logging
//! - Validation with per-path errors and warnings

pub mod defaults;
pub mod env;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::ConfigError;
pub use redact::{collect_redacted_paths, redact};
pub use schema::{
    AuthDelegateConfig, FleetConfig, FunctionsConfig, LogConfig, LogFormat, MailConfig,
    RelayConfig, ServerConfig, StorageBackend, StorageConfig, UploadConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

/// Validate `config` and log every finding.
///
/// Call once logging is up; binaries refuse to start when the report has errors.
pub fn check(config: &FunctionsConfig) -> ValidationReport {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    report
}
