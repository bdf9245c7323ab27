//! Structured logging for fnrelay.
//!
//! Handles subscriber setup (console plus optional rolling NDJSON files) and
//! redaction of tokens before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
