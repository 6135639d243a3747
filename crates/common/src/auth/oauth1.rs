//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Produces the `Authorization: OAuth ...` header defined by RFC 5849 and used
//! by the X API for user-context requests. The steps are:
//!
//! 1. Merge the protocol parameters with the URL query and any signed body
//!    parameters.
//! 2. Percent-encode keys and values with the unreserved set, then sort by
//!    encoded key and encoded value.
//! 3. Sign `METHOD&enc(base_url)&enc(params)` with
//!    `enc(consumer_secret)&enc(token_secret)`.
//!
//! The nonce and timestamp used for the signature are returned alongside the
//! header so the sender never regenerates them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use sha1::Sha1;
use thiserror::Error;
use url::Url;

use super::types::OAuth1Credentials;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";
const NONCE_LENGTH: usize = 32;

/// Signing preconditions that failed. None of these are retryable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("OAuth 1.0a credentials are not configured")]
    NotConfigured,

    #[error("cannot sign request for invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Percent-encode with the RFC 3986 unreserved set `[A-Za-z0-9-._~]`.
///
/// Space becomes `%20`, never `+`.
#[must_use]
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// 32 random alphanumeric characters.
#[must_use]
pub fn generate_nonce() -> String {
    Alphanumeric.sample_string(&mut OsRng, NONCE_LENGTH)
}

/// A signed `Authorization` header and the values it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Full header value, starting with `OAuth `.
    pub authorization: String,
    pub nonce: String,
    pub timestamp: String,
    pub signature: String,
    pub base_string: String,
}

/// Signs requests with one fixed credential tuple.
#[derive(Clone)]
pub struct OAuth1Signer {
    credentials: OAuth1Credentials,
}

impl std::fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Signer").field("credentials", &self.credentials).finish()
    }
}

impl OAuth1Signer {
    /// # Errors
    /// `SignatureError::NotConfigured` unless all four credential fields are
    /// non-blank.
    pub fn new(credentials: OAuth1Credentials) -> Result<Self, SignatureError> {
        if !credentials.is_complete() {
            return Err(SignatureError::NotConfigured);
        }
        Ok(Self { credentials })
    }

    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.credentials.consumer_key
    }

    /// Sign with a fresh nonce and the current Unix time.
    ///
    /// `extra_params` are form-body parameters that take part in the
    /// signature. Query parameters are read from `url` itself.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        extra_params: &[(String, String)],
    ) -> Result<SignedRequest, SignatureError> {
        let nonce = generate_nonce();
        let timestamp = Utc::now().timestamp().to_string();
        self.sign_with(method, url, extra_params, &nonce, &timestamp)
    }

    /// Sign with a caller-supplied nonce and timestamp.
    pub fn sign_with(
        &self,
        method: &str,
        url: &str,
        extra_params: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<SignedRequest, SignatureError> {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.credentials.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.credentials.access_token.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];

        let (base_url, query_params) = split_url(url)?;
        let mut all_params = oauth_params.clone();
        all_params.extend(query_params);
        all_params.extend(extra_params.iter().cloned());

        let base_string = signature_base_string(method, &base_url, &all_params);
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.credentials.consumer_secret),
            percent_encode(&self.credentials.access_token_secret)
        );
        let signature = hmac_sha1_base64(&signing_key, &base_string)?;

        oauth_params.push(("oauth_signature".to_string(), signature.clone()));
        oauth_params.sort();
        let authorization = format!(
            "OAuth {}",
            oauth_params
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(SignedRequest {
            authorization,
            nonce: nonce.to_string(),
            timestamp: timestamp.to_string(),
            signature,
            base_string,
        })
    }
}

/// `METHOD&enc(base_url)&enc(sorted, encoded parameter string)`
///
/// `base_url` must already be stripped of its query and fragment.
#[must_use]
pub fn signature_base_string(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url),
        percent_encode(&normalized_parameters(params))
    )
}

/// Encode, sort by encoded key then encoded value, and join with `&`.
#[must_use]
pub fn normalized_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(k, v)| (percent_encode(k), percent_encode(v))).collect();
    encoded.sort();
    encoded.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

/// Split a URL into its base (scheme, host, path) and decoded query pairs.
fn split_url(raw: &str) -> Result<(String, Vec<(String, String)>), SignatureError> {
    let mut url = Url::parse(raw).map_err(|e| SignatureError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(SignatureError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    url.set_query(None);
    url.set_fragment(None);
    Ok((url.to_string(), query))
}

fn hmac_sha1_base64(key: &str, data: &str) -> Result<String, SignatureError> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
