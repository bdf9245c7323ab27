//! Log Redaction Layer
//!
//! Scrubs bearer tokens, JWTs and API keys from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Bearer|Basic)\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
static JWT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"eyJ[a-zA-Z0-9_\-]+\.[a-zA-Z0-9_\-]+\.[a-zA-Z0-9_\-]+").unwrap()
});
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("?(?:accessToken|authToken|api[_-]?key|secret)"?\s*[:=]\s*"?)[^"\s,&}]+"#)
        .unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = BEARER_RE.replace_all(input, "$1 [REDACTED_TOKEN]").to_string();
    redacted = JWT_RE.replace_all(&redacted, "[REDACTED_JWT]").to_string();
    redacted = API_KEY_RE.replace_all(&redacted, "${1}[REDACTED]").to_string();
    redacted
}
