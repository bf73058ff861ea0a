use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON error object Discord returns alongside a non-2xx status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
    /// Nested validation errors keyed by the offending field path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl ApiError {
    /// Wrap a body that could not be parsed as JSON.
    pub fn from_text(text: &str) -> Self {
        Self {
            code: 0,
            message: text.to_string(),
            errors: None,
        }
    }

    pub fn from_body(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Self::from_text(&String::from_utf8_lossy(bytes)))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} (error code: {})", self.message, self.code)
        }
    }
}

/// Body of a 429 response.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitedBody {
    #[serde(default = "default_retry_after")]
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub message: String,
}

fn default_retry_after() -> f64 {
    40.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_discord_error() {
        let err = ApiError::from_body(br#"{"code": 50001, "message": "Missing Access"}"#);
        assert_eq!(err.code, 50001);
        assert_eq!(err.to_string(), "Missing Access (error code: 50001)");
    }

    #[test]
    fn falls_back_to_text() {
        let err = ApiError::from_body(b"<html>bad gateway</html>");
        assert_eq!(err.code, 0);
        assert_eq!(err.message, "<html>bad gateway</html>");
    }

    #[test]
    fn rate_limit_defaults() {
        let body: RateLimitedBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.retry_after, 40.0);
        assert!(!body.global);
    }
}
