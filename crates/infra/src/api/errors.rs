//! API-specific error types
//!
//! Provides the error taxonomy of authenticated X API calls with retry
//! metadata.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::http::TransportError;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Credentials missing or rejected - the user must (re)authorize
    Auth,
    /// Rate limiting (429) - retry after the hinted delay
    RateLimit,
    /// Server errors (5xx) - retryable by the caller
    Server,
    /// Client errors (4xx except 401/429) - non-retryable
    Client,
    /// Connection failures - retryable
    Network,
    /// Local precondition or storage failures - non-retryable
    Config,
    Timeout,
    Cancelled,
}

/// API operation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("credentials not configured")]
    NotConfigured,

    #[error("request signing failed: {0}")]
    Signature(String),

    #[error("credentials were rejected")]
    Unauthorized,

    #[error("rate limited{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error {status}{}", detail_suffix(.message))]
    Server { status: u16, message: Option<String> },

    #[error("HTTP {status}{}", detail_suffix(.body))]
    Http { status: u16, body: Option<String> },

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decoding(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("secret store error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Get the error category for this error
    pub const fn category(&self) -> ApiErrorCategory {
        match self {
            Self::NotConfigured | Self::Unauthorized => ApiErrorCategory::Auth,
            Self::RateLimited { .. } => ApiErrorCategory::RateLimit,
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Http { .. } | Self::Decoding(_) => ApiErrorCategory::Client,
            Self::Network(_) => ApiErrorCategory::Network,
            Self::Timeout(_) => ApiErrorCategory::Timeout,
            Self::Cancelled => ApiErrorCategory::Cancelled,
            Self::Signature(_) | Self::InvalidRequest(_) | Self::Storage(_) => {
                ApiErrorCategory::Config
            }
        }
    }

    /// Whether the caller may retry the same request later.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Server { .. }
            | Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The user must run authorization (or configure credentials) again.
    pub const fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::Unauthorized)
    }

    /// `Retry-After` hint of a rate-limited response.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default()
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(after) => Self::Timeout(after),
            TransportError::Connect(message) | TransportError::Request(message) => {
                Self::Network(message)
            }
            TransportError::Build(message) => Self::InvalidRequest(message),
        }
    }
}

/// X API v2 problem body (`{title, detail, type, status}`).
///
/// Older endpoints answer with `{errors: [{message, code}]}` instead.
#[derive(Debug, Default, Deserialize)]
pub struct ProblemDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub errors: Vec<LegacyError>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyError {
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

impl ProblemDetails {
    /// Best human-readable message in a response body, if it parses.
    pub fn message_from(body: &[u8]) -> Option<String> {
        let problem: Self = serde_json::from_slice(body).ok()?;
        problem
            .detail
            .or(problem.title)
            .or_else(|| problem.errors.into_iter().next().map(|e| e.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(ApiError::Unauthorized.category(), ApiErrorCategory::Auth);
        assert_eq!(ApiError::NotConfigured.category(), ApiErrorCategory::Auth);
        let cases = [
            (ApiError::RateLimited { retry_after: None }, ApiErrorCategory::RateLimit),
            (ApiError::Server { status: 503, message: None }, ApiErrorCategory::Server),
            (ApiError::Network("reset".into()), ApiErrorCategory::Network),
            (ApiError::Timeout(Duration::from_secs(30)), ApiErrorCategory::Timeout),
            (ApiError::Cancelled, ApiErrorCategory::Cancelled),
        ];
        for (error, category) in cases {
            assert_eq!(error.category(), category, "{error}");
        }
    }

    #[test]
    fn test_is_retryable() {
        assert!(ApiError::RateLimited { retry_after: Some(Duration::from_secs(5)) }.is_retryable());
        assert!(ApiError::Server { status: 500, message: None }.is_retryable());
        assert!(ApiError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ApiError::Network("down".into()).is_retryable());
        assert!(!ApiError::Unauthorized.is_retryable());
        assert!(!ApiError::Http { status: 403, body: None }.is_retryable());
        assert!(!ApiError::Cancelled.is_retryable());
        assert!(!ApiError::Decoding("eof".into()).is_retryable());
    }

    #[test]
    fn reauthorization_is_only_for_credential_errors() {
        assert!(ApiError::Unauthorized.requires_reauthorization());
        assert!(ApiError::NotConfigured.requires_reauthorization());
        assert!(!ApiError::Http { status: 403, body: None }.requires_reauthorization());
    }

    #[test]
    fn display_includes_optional_details() {
        assert_eq!(
            ApiError::RateLimited { retry_after: Some(Duration::from_secs(15)) }.to_string(),
            "rate limited, retry after 15s"
        );
        assert_eq!(ApiError::RateLimited { retry_after: None }.to_string(), "rate limited");
        assert_eq!(
            ApiError::Server { status: 503, message: Some("Service Unavailable".into()) }
                .to_string(),
            "server error 503: Service Unavailable"
        );
    }

    #[test]
    fn transport_errors_map_to_distinct_kinds() {
        let after = Duration::from_secs(30);
        assert_eq!(ApiError::from(TransportError::Timeout(after)), ApiError::Timeout(after));
        let refused = ApiError::from(TransportError::Connect("refused".into()));
        assert!(matches!(refused, ApiError::Network(_)));
        let build = ApiError::from(TransportError::Build("tls".into()));
        assert!(matches!(build, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn problem_details_prefer_detail() {
        let body = br#"{"title":"Service Unavailable","detail":"Try again later.","status":503}"#;
        assert_eq!(ProblemDetails::message_from(body).as_deref(), Some("Try again later."));

        let legacy = br#"{"errors":[{"message":"Over capacity","code":130}]}"#;
        assert_eq!(ProblemDetails::message_from(legacy).as_deref(), Some("Over capacity"));

        assert_eq!(ProblemDetails::message_from(b"<html>"), None);
    }
}
