//! Interactive authorization session contract and callback handling
//!
//! Presenting the browser is the host application's job. The core hands over
//! the authorize URL and callback scheme, then parses whatever callback URL
//! comes back.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use super::pkce::validate_state;

/// Failures of the interactive part of the PKCE flow.
///
/// `Cancelled` is kept apart from everything else so the UI can stay quiet
/// when the user simply closed the window.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("authorization was cancelled")]
    Cancelled,

    #[error("authorization session failed to start: {0}")]
    SessionFailedToStart(String),

    #[error("authorization session returned no callback URL")]
    MissingCallbackUrl,

    #[error("callback URL has no authorization code")]
    MissingAuthorizationCode,

    #[error("callback URL is malformed: {0}")]
    InvalidCallbackUrl(String),

    #[error("callback state does not match the authorization request")]
    StateMismatch,

    #[error("provider denied authorization: {error}")]
    Denied { error: String, description: Option<String> },
}

impl AuthorizationError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Presents the authorize URL to the user and captures the redirect.
#[async_trait]
pub trait AuthorizationSession: Send + Sync {
    /// Open `authorization_url` and wait for a redirect to `callback_scheme`.
    ///
    /// Returns `Ok(None)` if the session ended without a callback URL.
    ///
    /// # Errors
    /// `Cancelled` when the user dismissed the session,
    /// `SessionFailedToStart` when it could not be shown.
    async fn present(
        &self,
        authorization_url: &str,
        callback_scheme: &str,
    ) -> Result<Option<String>, AuthorizationError>;
}

/// Extract the authorization code from a callback URL.
///
/// A `state` parameter, when present, must equal `expected_state`. An
/// `error=access_denied` callback is the user declining on the provider's
/// page and is reported as `Cancelled`.
pub fn parse_callback(
    callback_url: &str,
    expected_state: &str,
) -> Result<String, AuthorizationError> {
    let url = Url::parse(callback_url)
        .map_err(|e| AuthorizationError::InvalidCallbackUrl(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        if error == "access_denied" {
            return Err(AuthorizationError::Cancelled);
        }
        return Err(AuthorizationError::Denied { error, description: error_description });
    }

    if let Some(state) = state {
        if !validate_state(expected_state, &state) {
            return Err(AuthorizationError::StateMismatch);
        }
    }

    code.filter(|c| !c.is_empty()).ok_or(AuthorizationError::MissingAuthorizationCode)
}
