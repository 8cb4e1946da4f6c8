//! Utility helpers shared by the registry, engine, and CLI.
//!
//! - [`http`]: client construction, media-type checks, strict JSON decoding
//! - [`interpolation`]: `${env:NAME}` expansion for configuration values
//! - [`path_processing`]: `~` expansion for user supplied paths

pub mod http;
pub mod interpolation;
pub mod path_processing;

pub use interpolation::{InterpolationError, interpolate_env};
pub use path_processing::expand_tilde;

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
        r#"(?i)("?[A-Za-z0-9_]*?(?:key|token|secret|password)"?\s*[:=]\s*"?)([^\s",}]+)"#,
        r"(?i)(DATABASE_URL=)([^\s]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid redaction pattern"))
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// Used before response bodies or payloads are written to logs.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for regex in SENSITIVE_PATTERNS.iter() {
        redacted = regex
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::redact_sensitive;

    #[test]
    fn redacts_json_style_secrets() {
        let line = r#"{"email":"a@b.com","password":"hunter2"}"#;
        let redacted = redact_sensitive(line);
        assert!(!redacted.contains("hunter2"));
        assert!(redacted.contains("a@b.com"));
    }

    #[test]
    fn redacts_env_assignments_and_headers() {
        assert_eq!(redact_sensitive("API_TOKEN=abc123"), "API_TOKEN=<redacted>");
        assert_eq!(redact_sensitive("Authorization: Bearer"), "Authorization: <redacted>");
        assert_eq!(redact_sensitive("DATABASE_URL=postgres://u:p@h/db"), "DATABASE_URL=<redacted>");
    }
}
