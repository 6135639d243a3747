//! Credential types shared by both authentication schemes
//!
//! Defines the OAuth 2.0 token triple, the token endpoint response, the
//! OAuth 1.0a credential tuple, and provider configuration.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest access token lifetime honored from a token response (one year).
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// OAuth 2.0 access token with its refresh token and expiry
///
/// Replaced as a whole; never updated field by field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    /// Absent when the grant did not issue one. Without it the user has to
    /// authorize again once the access token expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (always "bearer" for X)
    pub token_type: String,

    /// Point in time after which the access token must not be sent.
    pub expires_at: DateTime<Utc>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Build a token set whose access token expires `expires_in` seconds
    /// after `issued_at`.
    ///
    /// Lifetimes above [`MAX_TOKEN_LIFETIME_SECS`] are capped. An expiry that
    /// still cannot be represented collapses to `issued_at`.
    #[must_use]
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let lifetime = response.expires_in.min(MAX_TOKEN_LIFETIME_SECS);
        let expires_at = i64::try_from(lifetime)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .unwrap_or(issued_at);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expires_at,
            scope: response.scope,
        }
    }

    /// Whether the token is expired, or will be within `skew`, at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now.checked_add_signed(skew).map_or(true, |limit| self.expires_at <= limit)
    }

    #[must_use]
    pub fn is_expired(&self, skew: Duration) -> bool {
        self.is_expired_at(Utc::now(), skew)
    }

    /// Seconds until expiry, negative once expired.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Token endpoint response body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub expires_in: u64,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth 2.0 error body (RFC 6749 section 5.2)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

/// OAuth 2.0 provider endpoints and redirect settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub authorize_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub redirect_uri: String,
    /// URL scheme the interactive session listens for (e.g. `agentdodo`).
    pub callback_scheme: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Space-joined scope list as sent in the authorize request.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Which OAuth 2.0 client id is in effect.
///
/// A user-configured id and the application's built-in id are separate
/// states. The built-in id is only used when nothing is configured, and it is
/// never written back to the secret store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientId {
    Configured(String),
    BuiltIn(String),
}

impl ClientId {
    /// Pick the configured id when present, otherwise the built-in one.
    ///
    /// Blank values count as absent.
    #[must_use]
    pub fn resolve(configured: Option<String>, built_in: Option<&str>) -> Option<Self> {
        match configured.filter(|id| !id.trim().is_empty()) {
            Some(id) => Some(Self::Configured(id)),
            None => built_in
                .filter(|id| !id.trim().is_empty())
                .map(|id| Self::BuiltIn(id.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Configured(id) | Self::BuiltIn(id) => id,
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

/// OAuth 1.0a user-context credentials
///
/// All four fields are required together.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl OAuth1Credentials {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// Assemble credentials from individually stored parts. Returns `None`
    /// unless every part is present and non-blank.
    #[must_use]
    pub fn from_parts(
        consumer_key: Option<String>,
        consumer_secret: Option<String>,
        access_token: Option<String>,
        access_token_secret: Option<String>,
    ) -> Option<Self> {
        let credentials =
            Self::new(consumer_key?, consumer_secret?, access_token?, access_token_secret?);
        credentials.is_complete().then_some(credentials)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.consumer_key, &self.consumer_secret, &self.access_token, &self.access_token_secret]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

impl fmt::Debug for OAuth1Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[redacted]")
            .field("access_token", &"[redacted]")
            .field("access_token_secret", &"[redacted]")
            .finish()
    }
}
