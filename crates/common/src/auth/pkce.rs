//! PKCE (Proof Key for Code Exchange) for the OAuth 2.0 authorization code flow
//!
//! Implements RFC 7636 with the `S256` method. Desktop clients cannot keep a
//! client secret, so every authorization attempt gets a fresh verifier.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// RFC 7636 unreserved characters: `[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"`
const VERIFIER_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Verifier length. RFC 7636 allows 43 to 128.
pub const CODE_VERIFIER_LENGTH: usize = 64;

/// The only challenge method this client sends.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Generate a code verifier from the OS random source.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut rng = OsRng;
    (0..CODE_VERIFIER_LENGTH)
        .filter_map(|_| VERIFIER_ALPHABET.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect()
}

/// `BASE64URL-NOPAD(SHA256(ASCII(code_verifier)))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Check a challenge the way the provider does.
#[must_use]
pub fn verify_code_challenge(verifier: &str, challenge: &str) -> bool {
    constant_time_eq(generate_code_challenge(verifier).as_bytes(), challenge.as_bytes())
}

/// Random CSRF correlation token: 32 bytes, base64url without padding.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare the state sent with the authorize request against the callback's.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    constant_time_eq(expected.as_bytes(), actual.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verifier and challenge generated together for one authorization attempt.
///
/// Used once, then dropped.
#[derive(Clone)]
pub struct PkceCredentials {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkceCredentials {
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}

impl std::fmt::Debug for PkceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceCredentials")
            .field("code_verifier", &"[redacted]")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

/// Shorthand for [`PkceCredentials::generate`].
#[must_use]
pub fn generate_pkce() -> PkceCredentials {
    PkceCredentials::generate()
}

/// An authorize URL together with the `state` it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Build the provider's authorize URL with a freshly generated `state`.
#[must_use]
pub fn build_authorization_url(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    code_challenge: &str,
    scopes: &[String],
) -> AuthorizationRequest {
    let state = generate_state();
    let url = authorization_url_with_state(
        authorize_endpoint,
        client_id,
        redirect_uri,
        code_challenge,
        scopes,
        &state,
    );
    AuthorizationRequest { url, state }
}

/// Deterministic authorize URL for a given `state`.
///
/// Values are percent-encoded with the unreserved set, so the space-joined
/// scope list goes out as `%20`.
#[must_use]
pub fn authorization_url_with_state(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    code_challenge: &str,
    scopes: &[String],
    state: &str,
) -> String {
    let scope = scopes.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("state", state),
        ("code_challenge", code_challenge),
        ("code_challenge_method", CODE_CHALLENGE_METHOD),
    ];
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if authorize_endpoint.contains('?') { '&' } else { '?' };
    format!("{authorize_endpoint}{separator}{query}")
}
