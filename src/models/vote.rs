use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Current vote state of one user on one post, keyed by (user_id, post_id).
// Not an append log: re-votes update this row in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Upvote {
    pub user_id: i32,
    pub post_id: i32,
    pub value: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub value: i32,
}
