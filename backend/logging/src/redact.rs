//! Log Redaction
//!
//! Scrubs phone numbers and bearer tokens from strings prior to logging.
//! History files keep the raw payload; only log output is redacted.

use regex::Regex;
use std::sync::LazyLock;

// Local mobile numbers (01XXXXXXXXX, optionally +880/880 prefixed) and
// generic 3-3-4 grouped numbers.
static TELEPHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?880[-\s]?)?\b01\d{9}\b|(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
        .unwrap()
});
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = TELEPHONE_RE.replace_all(input, "[REDACTED_PHONE]");
    TOKEN_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}
