//! Configuration structures
//!
//! Everything here deserializes with `#[serde(default)]`, so a config file only
//! needs the keys it wants to override. Loading from disk and the environment
//! lives in `agentdodo-infra`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZE_URL, DEFAULT_CALLBACK_SCHEME, DEFAULT_KEYCHAIN_SERVICE,
    DEFAULT_LOG_FILTER, DEFAULT_REDIRECT_URI, DEFAULT_REFRESH_SKEW_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_REVOKE_URL, DEFAULT_SCOPES, DEFAULT_TOKEN_URL,
    DEFAULT_UPLOAD_BASE_URL, DEFAULT_UPLOAD_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    MAX_REFRESH_SKEW_SECS,
};
use crate::errors::{DodoError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub x: XApiConfig,
    pub http: HttpConfig,
    pub keychain: KeychainConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("x.api_base_url", &self.x.api_base_url),
            ("x.upload_base_url", &self.x.upload_base_url),
            ("x.authorize_url", &self.x.authorize_url),
            ("x.token_url", &self.x.token_url),
            ("x.revoke_url", &self.x.revoke_url),
            ("x.redirect_uri", &self.x.redirect_uri),
        ];
        for (name, value) in urls {
            if value.trim().is_empty() {
                return Err(DodoError::Config(format!("{name} must not be empty")));
            }
        }
        if self.x.scopes.is_empty() {
            return Err(DodoError::Config("x.scopes must contain at least one scope".into()));
        }
        if self.http.request_timeout_secs == 0 || self.http.upload_timeout_secs == 0 {
            return Err(DodoError::Config("http timeouts must be greater than zero".into()));
        }
        if self.x.refresh_skew_secs > MAX_REFRESH_SKEW_SECS {
            return Err(DodoError::Config(format!(
                "x.refresh_skew_secs must be at most {MAX_REFRESH_SKEW_SECS}"
            )));
        }
        if self.keychain.service.trim().is_empty() {
            return Err(DodoError::Config("keychain.service must not be empty".into()));
        }
        Ok(())
    }
}

/// Which signing strategy requests use. Chosen once when the client is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// OAuth 1.0a user context (consumer key/secret + access token/secret).
    #[serde(alias = "oauth1a")]
    OAuth1,
    /// OAuth 2.0 Authorization Code with PKCE.
    #[default]
    OAuth2,
}

impl std::str::FromStr for AuthScheme {
    type Err = DodoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oauth1" | "oauth1a" => Ok(Self::OAuth1),
            "oauth2" => Ok(Self::OAuth2),
            other => Err(DodoError::Config(format!("unknown auth scheme '{other}'"))),
        }
    }
}

/// X API endpoints and OAuth client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XApiConfig {
    pub api_base_url: String,
    pub upload_base_url: String,
    pub authorize_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub redirect_uri: String,
    pub callback_scheme: String,
    pub scopes: Vec<String>,
    pub auth_scheme: AuthScheme,
    /// Built-in client id, used only when the user has not configured one.
    pub default_client_id: Option<String>,
    /// Tokens expiring within this window are treated as already expired.
    pub refresh_skew_secs: u64,
}

impl Default for XApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            revoke_url: DEFAULT_REVOKE_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            callback_scheme: DEFAULT_CALLBACK_SCHEME.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            auth_scheme: AuthScheme::default(),
            default_client_id: None,
            refresh_skew_secs: DEFAULT_REFRESH_SKEW_SECS,
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Secret storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeychainConfig {
    pub service: String,
}

impl Default for KeychainConfig {
    fn default() -> Self {
        Self { service: DEFAULT_KEYCHAIN_SERVICE.to_string() }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_string(), json: false }
    }
}
