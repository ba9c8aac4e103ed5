//! Structured errors surfaced by the API layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of API errors for consistent handling at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Non-2xx response (other than a 401 that led to session expiry)
    HttpStatus,
    /// Connection failure or unreadable response
    Transport,
    /// Request exceeded the configured timeout
    Timeout,
    /// Refresh exchange failed; local credentials were cleared
    SessionExpired,
    /// Response body did not match the endpoint's payload type
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::SessionExpired => write!(f, "session_expired"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Error returned by every API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// HTTP status, when the server answered
    pub status: Option<u16>,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// Creates an HTTP status error, pulling a human-readable message out of
    /// `error.message` or `message` when the body is JSON.
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());
        let message = match extract_message(body) {
            Some(msg) => msg,
            None => format!("HTTP {status}"),
        };
        Self {
            kind: ApiErrorKind::HttpStatus,
            message,
            status: Some(status),
            details,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn session_expired() -> Self {
        Self::new(
            ApiErrorKind::SessionExpired,
            "Session expired. Please log in again.",
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Maps a reqwest failure onto `Timeout` or `Transport`.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timed out: {err}"))
        } else {
            Self::transport(format!("Network error: {err}"))
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == ApiErrorKind::SessionExpired
    }

    pub fn is_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }
}

/// Finds the display message in an error body: `error.message`, then
/// `message`, then a bare string `error`.
pub fn extract_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let candidates = [
        json.get("error").and_then(|e| e.get("message")),
        json.get("message"),
        json.get("error"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) if !self.message.starts_with("HTTP ") => {
                write!(f, "{} (HTTP {status})", self.message)
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_prefers_nested_error_message() {
        let body = r#"{"error":{"code":"VALIDATION","message":"Email is invalid"},"message":"outer"}"#;
        let err = ApiError::http_status(400, body);
        assert_eq!(err.kind, ApiErrorKind::HttpStatus);
        assert_eq!(err.message, "Email is invalid");
        assert_eq!(err.status, Some(400));
        assert_eq!(err.details.as_deref(), Some(body));
        assert_eq!(err.to_string(), "Email is invalid (HTTP 400)");
    }

    #[test]
    fn test_http_status_uses_top_level_message() {
        let err = ApiError::http_status(409, r#"{"message":"Car is not available for the selected dates"}"#);
        assert_eq!(err.message, "Car is not available for the selected dates");
        assert!(err.is_status(409));
    }

    #[test]
    fn test_http_status_without_json_body() {
        let err = ApiError::http_status(502, "<html>bad gateway</html>");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.to_string(), "HTTP 502");

        let empty = ApiError::http_status(500, "");
        assert!(empty.details.is_none());
    }

    #[test]
    fn test_extract_message_string_error() {
        assert_eq!(
            extract_message(r#"{"error":"Unauthorized"}"#).as_deref(),
            Some("Unauthorized")
        );
        assert_eq!(extract_message(r#"{"error":{"code":"X"}}"#), None);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ApiErrorKind::SessionExpired.to_string(), "session_expired");
        assert!(ApiError::session_expired().is_session_expired());
    }
}
