//! Content-Type inspection.

/// Media type handlers are expected to answer with.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Returns the media type essence of a `Content-Type` value, lowercased and
/// without parameters (`Application/JSON; charset=utf-8` -> `application/json`).
pub fn media_type_essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// True when the `Content-Type` value denotes JSON.
pub fn is_json_content_type(content_type: &str) -> bool {
    media_type_essence(content_type) == JSON_MEDIA_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_json_with_parameters_and_any_case() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("Application/JSON"));
    }

    #[test]
    fn rejects_other_media_types() {
        assert!(!is_json_content_type("text/plain; charset=utf-8"));
        assert!(!is_json_content_type("text/html"));
        assert!(!is_json_content_type(""));
        assert!(!is_json_content_type("application/jsonp"));
    }
}
