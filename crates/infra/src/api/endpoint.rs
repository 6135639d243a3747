//! Generic endpoint abstraction and the X API endpoints
//!
//! An endpoint knows its method, host, path, query and body. The executor
//! turns that into a URL and request bytes; the OAuth 1.0a signer sees the
//! same query and form parameters that go on the wire.

use reqwest::Method;
use serde_json::{json, Value};

/// Which configured base URL a path is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiHost {
    Api,
    Upload,
}

/// Which configured timeout applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Standard,
    Upload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`; parameters are signed under
    /// OAuth 1.0a.
    Form(Vec<(String, String)>),
}

/// One logical API call.
pub trait ApiEndpoint: Send + Sync {
    fn method(&self) -> Method;

    /// Path starting with `/`, already percent-encoded.
    fn path(&self) -> String;

    fn host(&self) -> ApiHost {
        ApiHost::Api
    }

    fn query(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn body(&self) -> RequestBody {
        RequestBody::Empty
    }

    fn timeout_class(&self) -> TimeoutClass {
        TimeoutClass::Standard
    }
}

pub const USER_FIELDS: &str = "profile_image_url,description,public_metrics";
pub const POST_FIELDS: &str = "created_at,author_id,public_metrics";

/// Endpoints of the X API used by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEndpoint {
    CreatePost { text: String, reply_to: Option<String> },
    DeletePost { id: String },
    GetPost { id: String },
    CurrentUser,
    UserPosts { user_id: String, max_results: u8 },
    Mentions { user_id: String, max_results: u8 },
    SearchRecent { query: String, max_results: u8 },
    /// First command of the chunked media upload.
    MediaUploadInit { total_bytes: u64, media_type: String, media_category: Option<String> },
}

impl ApiEndpoint for XEndpoint {
    fn method(&self) -> Method {
        match self {
            Self::CreatePost { .. } | Self::MediaUploadInit { .. } => Method::POST,
            Self::DeletePost { .. } => Method::DELETE,
            _ => Method::GET,
        }
    }

    fn path(&self) -> String {
        match self {
            Self::CreatePost { .. } => "/2/tweets".to_string(),
            Self::DeletePost { id } | Self::GetPost { id } => format!("/2/tweets/{}", segment(id)),
            Self::CurrentUser => "/2/users/me".to_string(),
            Self::UserPosts { user_id, .. } => format!("/2/users/{}/tweets", segment(user_id)),
            Self::Mentions { user_id, .. } => format!("/2/users/{}/mentions", segment(user_id)),
            Self::SearchRecent { .. } => "/2/tweets/search/recent".to_string(),
            Self::MediaUploadInit { .. } => "/1.1/media/upload.json".to_string(),
        }
    }

    fn host(&self) -> ApiHost {
        match self {
            Self::MediaUploadInit { .. } => ApiHost::Upload,
            _ => ApiHost::Api,
        }
    }

    fn query(&self) -> Vec<(String, String)> {
        match self {
            Self::CurrentUser => vec![pair("user.fields", USER_FIELDS)],
            Self::GetPost { .. } => vec![pair("tweet.fields", POST_FIELDS)],
            Self::UserPosts { max_results, .. } | Self::Mentions { max_results, .. } => vec![
                pair("max_results", &(*max_results).clamp(MIN_PAGE, MAX_PAGE).to_string()),
                pair("tweet.fields", POST_FIELDS),
            ],
            Self::SearchRecent { query, max_results } => vec![
                pair("query", query),
                pair("max_results", &(*max_results).clamp(MIN_SEARCH_PAGE, MAX_PAGE).to_string()),
                pair("tweet.fields", POST_FIELDS),
            ],
            _ => Vec::new(),
        }
    }

    fn body(&self) -> RequestBody {
        match self {
            Self::CreatePost { text, reply_to: None } => RequestBody::Json(json!({ "text": text })),
            Self::CreatePost { text, reply_to: Some(parent) } => RequestBody::Json(json!({
                "text": text,
                "reply": { "in_reply_to_tweet_id": parent }
            })),
            Self::MediaUploadInit { total_bytes, media_type, media_category } => {
                let mut form = vec![
                    pair("command", "INIT"),
                    pair("total_bytes", &total_bytes.to_string()),
                    pair("media_type", media_type),
                ];
                if let Some(category) = media_category {
                    form.push(pair("media_category", category));
                }
                RequestBody::Form(form)
            }
            _ => RequestBody::Empty,
        }
    }

    fn timeout_class(&self) -> TimeoutClass {
        match self {
            Self::MediaUploadInit { .. } => TimeoutClass::Upload,
            _ => TimeoutClass::Standard,
        }
    }
}

// Page sizes the server accepts; anything outside is rejected with 400.
const MIN_PAGE: u8 = 5;
const MIN_SEARCH_PAGE: u8 = 10;
const MAX_PAGE: u8 = 100;

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `k=v&k=v` with RFC 3986 encoding (space as `%20`).
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
