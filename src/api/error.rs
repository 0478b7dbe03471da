use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response reached us at all: DNS, connect, TLS, or timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered, but with an error status.
    #[error("HTTP {status}: {body}")]
    Protocol { status: u16, body: String },
}

/// Maximum length for response bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    pub fn protocol(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Protocol {
            status: status.as_u16(),
            body: truncate_body(body),
        }
    }
}

/// Truncate a response body to avoid dragging payloads into logs
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut cut = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_body_kept_whole() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn test_long_body_truncated_with_length() {
        let body = "x".repeat(900);
        let truncated = truncate_body(&body);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 900 total bytes)"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 'é' is two bytes; a naive byte slice at 500 would panic
        let body = "é".repeat(400);
        let truncated = truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }
}
