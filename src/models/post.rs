use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Feed items carry a truncated body instead of the full text.
pub const SNIPPET_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub text: String,
    pub points: i32,
    pub creator_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn text_snippet(&self, limit: usize) -> String {
        let mut snippet: String = self.text.chars().take(limit).collect();
        if self.text.chars().count() > limit {
            snippet.push_str("...");
        }
        snippet
    }
}

// Creator as exposed on feed items, resolved through the user loader.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostCreator {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    pub text: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    pub text: Option<String>,
}

// Single-post response with creator and viewer vote state.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i32,
    pub title: String,
    pub text: String,
    pub points: i32,
    pub creator: Option<PostCreator>,
    pub vote_status: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Feed item: snippet instead of full body.
#[derive(Debug, Serialize)]
pub struct FeedPost {
    pub id: i32,
    pub title: String,
    pub text_snippet: String,
    pub points: i32,
    pub creator: Option<PostCreator>,
    pub vote_status: Option<i16>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<FeedPost>,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post_with_text(text: &str) -> Post {
        Post {
            id: 1,
            title: "t".to_string(),
            text: text.to_string(),
            points: 0,
            creator_id: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snippet_truncates_long_text() {
        let post = post_with_text(&"a".repeat(60));
        let snippet = post.text_snippet(SNIPPET_LIMIT);
        assert_eq!(snippet, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn snippet_keeps_short_text_intact() {
        let post = post_with_text("short body");
        assert_eq!(post.text_snippet(SNIPPET_LIMIT), "short body");
    }

    #[test]
    fn snippet_at_exact_limit_has_no_ellipsis() {
        let post = post_with_text(&"b".repeat(50));
        assert_eq!(post.text_snippet(SNIPPET_LIMIT), "b".repeat(50));
    }

    #[test]
    fn snippet_respects_multibyte_boundaries() {
        let post = post_with_text(&"é".repeat(60));
        let snippet = post.text_snippet(SNIPPET_LIMIT);
        assert_eq!(snippet.chars().count(), 53);
    }
}
