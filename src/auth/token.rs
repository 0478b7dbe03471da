//! Bearer token extraction from login response bodies.
//!
//! The auth endpoint has been observed answering with several shapes:
//! a flat `{"token": ...}` or `{"access_token": ...}` object, the same
//! fields nested under `data`, and occasionally bodies that are not quite
//! JSON at all. Extraction tries the typed parses first and only then
//! falls back to a raw text scan.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct TokenFields {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl TokenFields {
    fn first_non_empty(self) -> Option<String> {
        self.token
            .filter(|t| !t.is_empty())
            .or_else(|| self.access_token.filter(|t| !t.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct NestedTokenFields {
    #[serde(default)]
    data: Option<TokenFields>,
}

/// Pull a bearer token out of a response body, if one is there.
///
/// Applied to success and error bodies alike; first non-empty match wins.
/// Returns `None` for empty input or when nothing token-shaped is found.
pub fn extract_token(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    if let Ok(flat) = serde_json::from_str::<TokenFields>(body) {
        if let Some(token) = flat.first_non_empty() {
            return Some(token);
        }
    }

    if let Ok(nested) = serde_json::from_str::<NestedTokenFields>(body) {
        if let Some(token) = nested.data.and_then(TokenFields::first_non_empty) {
            return Some(token);
        }
    }

    scan_raw(body, "token").or_else(|| scan_raw(body, "access_token"))
}

/// Last-resort scrape for `"key": value` in text the typed parses could
/// not handle.
///
/// This is deliberately not a JSON parser: escapes inside quoted values
/// are not understood (a value containing `\"` is truncated at the
/// escape), and nested structure is invisible to it. It exists for
/// servers that answer with almost-JSON; well-formed bodies never reach
/// it.
fn scan_raw(body: &str, key: &str) -> Option<String> {
    let pattern = format!("\"{}\"", key);
    // ASCII-lowercased copy keeps byte offsets aligned with the original.
    let lowered: String = body.chars().map(|c| c.to_ascii_lowercase()).collect();
    let key_at = lowered.find(&pattern)?;

    let after_key = key_at + pattern.len();
    let colon = body[after_key..].find(':')? + after_key;

    let bytes = body.as_bytes();
    let mut start = colon + 1;
    while start < bytes.len() && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    if start >= bytes.len() {
        return None;
    }

    if bytes[start] == b'"' {
        let value_start = start + 1;
        let value_end = body[value_start..].find('"')? + value_start;
        let value = &body[value_start..value_end];
        return (!value.is_empty()).then(|| value.to_string());
    }

    // Unquoted value: read until comma, closing brace, or whitespace.
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        if b == b',' || b == b'}' || b.is_ascii_whitespace() {
            break;
        }
        end += 1;
    }
    let value = body[start..end].trim_matches(['"', ' ', '\r', '\n', '\t']);
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_token_field() {
        assert_eq!(
            extract_token(r#"{"token": "abc123"}"#),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_flat_access_token_field() {
        assert_eq!(
            extract_token(r#"{"access_token": "xyz789"}"#),
            Some("xyz789".to_string())
        );
    }

    #[test]
    fn test_token_preferred_over_access_token() {
        assert_eq!(
            extract_token(r#"{"token": "first", "access_token": "second"}"#),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_nested_data_object() {
        assert_eq!(
            extract_token(r#"{"data": {"token": "nested"}}"#),
            Some("nested".to_string())
        );
        assert_eq!(
            extract_token(r#"{"data": {"access_token": "nested2"}}"#),
            Some("nested2".to_string())
        );
    }

    #[test]
    fn test_extra_fields_ignored() {
        let body = r#"{"success": true, "token": "tok", "expires": 3600}"#;
        assert_eq!(extract_token(body), Some("tok".to_string()));
    }

    #[test]
    fn test_raw_scan_on_malformed_body() {
        // Trailing garbage makes this unparseable as JSON
        assert_eq!(
            extract_token(r#"oops "token":"salvaged" trailing"#),
            Some("salvaged".to_string())
        );
    }

    #[test]
    fn test_raw_scan_is_case_insensitive() {
        assert_eq!(
            extract_token(r#"{"Token": "Mixed"}"#),
            Some("Mixed".to_string())
        );
        assert_eq!(
            extract_token(r#"{"ACCESS_TOKEN": "SHOUTED"}"#),
            Some("SHOUTED".to_string())
        );
    }

    #[test]
    fn test_raw_scan_unquoted_value() {
        // Bare values are not valid JSON, so only the scan sees this
        assert_eq!(
            extract_token(r#"{"token": abc123,"other":1}"#),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        assert_eq!(extract_token(""), None);
    }

    #[test]
    fn test_empty_token_value_skipped() {
        assert_eq!(extract_token(r#"{"token": ""}"#), None);
    }

    #[test]
    fn test_body_without_token_yields_nothing() {
        assert_eq!(extract_token(r#"{"error": "bad credentials"}"#), None);
        assert_eq!(extract_token("Internal Server Error"), None);
    }

    #[test]
    fn test_error_body_with_token_still_extracts() {
        let body = r#"{"error": "account locked", "token": "still-usable"}"#;
        assert_eq!(extract_token(body), Some("still-usable".to_string()));
    }

    #[test]
    fn test_scan_stops_at_unescaped_quote() {
        // Known limitation: escapes are not handled, the value truncates
        assert_eq!(
            extract_token(r#"not-json "token":"ab\"cd""#),
            Some("ab\\".to_string())
        );
    }
}
