//! Posts as returned by the X API v2

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_POST_LENGTH;
use crate::errors::{DodoError, Result};

/// A post that exists on the remote platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePost {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<PostMetrics>,
}

/// Engagement counters (`public_metrics`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostMetrics {
    pub retweet_count: u64,
    pub reply_count: u64,
    pub like_count: u64,
    pub quote_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impression_count: Option<u64>,
}

/// Validate post text before it goes anywhere near the network.
///
/// Returns the trimmed text. Length is counted in Unicode scalar values.
pub fn validate_post_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DodoError::InvalidInput("post text cannot be empty".into()));
    }
    let length = trimmed.chars().count();
    if length > MAX_POST_LENGTH {
        return Err(DodoError::InvalidInput(format!(
            "post text is {length} characters, maximum is {MAX_POST_LENGTH}"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_text() {
        assert!(matches!(validate_post_text("   \n"), Err(DodoError::InvalidInput(_))));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(MAX_POST_LENGTH);
        assert_eq!(validate_post_text(&text).unwrap().chars().count(), MAX_POST_LENGTH);

        let too_long = "a".repeat(MAX_POST_LENGTH + 1);
        assert!(validate_post_text(&too_long).is_err());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(validate_post_text("  hello  ").unwrap(), "hello");
    }

    #[test]
    fn deserializes_minimal_post() {
        let post: RemotePost =
            serde_json::from_str(r#"{"id": "1", "text": "hi", "edit_history_tweet_ids": ["1"]}"#)
                .unwrap();
        assert_eq!(post.id, "1");
        assert!(post.author_id.is_none());
        assert!(post.public_metrics.is_none());
    }

    #[test]
    fn deserializes_created_at_and_metrics() {
        let post: RemotePost = serde_json::from_str(
            r#"{
                "id": "2",
                "text": "with metrics",
                "author_id": "42",
                "created_at": "2024-01-15T10:30:00.000Z",
                "public_metrics": {
                    "retweet_count": 1, "reply_count": 2, "like_count": 3, "quote_count": 4
                }
            }"#,
        )
        .unwrap();
        assert_eq!(post.author_id.as_deref(), Some("42"));
        assert!(post.created_at.is_some());
        assert_eq!(post.public_metrics.unwrap().like_count, 3);
    }
}
