//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Post limits
pub const MAX_POST_LENGTH: usize = 280;

// X API defaults
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com";
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://upload.twitter.com";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";
pub const DEFAULT_REVOKE_URL: &str = "https://api.twitter.com/2/oauth2/revoke";
pub const DEFAULT_REDIRECT_URI: &str = "agentdodo://auth/callback";
pub const DEFAULT_CALLBACK_SCHEME: &str = "agentdodo";

/// Scopes requested when the user does not pick their own.
pub const DEFAULT_SCOPES: &[&str] = &["tweet.read", "tweet.write", "users.read", "offline.access"];

// HTTP
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_USER_AGENT: &str = concat!("AgentDodo/", env!("CARGO_PKG_VERSION"));

// Token lifecycle
pub const DEFAULT_REFRESH_SKEW_SECS: u64 = 60;
pub const MAX_REFRESH_SKEW_SECS: u64 = 3600;

// Keychain
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "com.agentdodo.credentials";

// Logging
pub const DEFAULT_LOG_FILTER: &str = "info";
