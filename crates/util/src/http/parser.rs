//! # Response decoding
//!
//! Strict JSON decoding of handler responses with error messages that carry
//! enough context (status and a body preview) to debug a misbehaving handler.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Maximum number of characters of a body kept in error previews.
pub const BODY_PREVIEW_LIMIT: usize = 200;

/// Decodes a handler response body into `T`.
///
/// On failure the error keeps the response status and up to
/// [`BODY_PREVIEW_LIMIT`] characters of the body with whitespace collapsed.
///
/// # Example
/// ```rust
/// use lambdachain_util::http::decode_json_strict;
/// use serde_json::Value;
///
/// let value: Value = decode_json_strict(r#"{"data": {}}"#, None).unwrap();
/// assert!(value["data"].is_object());
///
/// let error = decode_json_strict::<Value>("<html>", None).unwrap_err();
/// assert_eq!(error.body_preview(), "<html>");
/// ```
pub fn decode_json_strict<T: DeserializeOwned>(text: &str, status: Option<StatusCode>) -> Result<T, JsonParseError> {
    serde_json::from_str::<T>(text).map_err(|cause| JsonParseError {
        status,
        preview: truncate_response_preview(text, BODY_PREVIEW_LIMIT),
        cause,
    })
}

/// Collapses whitespace and truncates `text` to roughly `limit` characters.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for (count, ch) in text.chars().enumerate() {
        if count >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// A response body that is not the JSON shape the caller expected.
#[derive(Debug, Error)]
#[error("handler response is not valid JSON ({}): {cause}; body: {preview}", describe_status(.status))]
pub struct JsonParseError {
    status: Option<StatusCode>,
    preview: String,
    #[source]
    cause: serde_json::Error,
}

impl JsonParseError {
    /// Truncated body captured when decoding failed.
    pub fn body_preview(&self) -> &str {
        &self.preview
    }
}

fn describe_status(status: &Option<StatusCode>) -> String {
    status.map_or_else(|| "status unknown".to_string(), |code| format!("status {code}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn preview_collapses_whitespace() {
        assert_eq!(truncate_response_preview("a\n\n\tb", 50), "a b");
        assert_eq!(truncate_response_preview("   ", 50), "<empty>");
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(300);
        let preview = truncate_response_preview(&body, 10);
        assert_eq!(preview, format!("{}...", "x".repeat(10)));
    }

    #[test]
    fn error_mentions_status_and_body() {
        let error = decode_json_strict::<Value>("not json", Some(StatusCode::OK)).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("status 200 OK"));
        assert!(message.contains("not json"));
        assert!(std::error::Error::source(&error).is_some());

        let error = decode_json_strict::<Value>("", None).unwrap_err();
        assert!(error.to_string().contains("status unknown"));
        assert_eq!(error.body_preview(), "<empty>");
    }
}
