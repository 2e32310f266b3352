use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    loaders::Loaders,
    models::{FeedPage, FeedPost, Post, SNIPPET_LIMIT},
};

/// Hard ceiling on page size, applied regardless of the requested limit.
pub const FEED_LIMIT_CEILING: i32 = 50;

pub fn effective_limit(limit: i32) -> i64 {
    limit.clamp(0, FEED_LIMIT_CEILING) as i64
}

/// Cursors are opaque decimal strings of a Unix-epoch millisecond
/// timestamp. Anything else is rejected, never silently ignored.
pub fn parse_cursor(cursor: &str) -> Result<DateTime<Utc>> {
    let millis = cursor
        .parse::<i64>()
        .map_err(|_| AppError::InvalidCursor(format!("Malformed cursor: {}", cursor)))?;

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppError::InvalidCursor(format!("Cursor out of range: {}", cursor)))
}

pub fn encode_cursor(created_at: DateTime<Utc>) -> String {
    created_at.timestamp_millis().to_string()
}

// The store is asked for one row beyond the page, so `has_more` needs no
// separate count query.
fn trim_page<T>(mut rows: Vec<T>, limit: usize) -> (Vec<T>, bool) {
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    (rows, has_more)
}

/// One page of the global feed, newest first, each post annotated with its
/// creator and the viewer's vote state through the request loaders.
pub async fn get_feed(
    db: &PgPool,
    loaders: &mut Loaders,
    limit: i32,
    cursor: Option<&str>,
) -> Result<FeedPage> {
    let boundary = cursor.map(parse_cursor).transpose()?;
    let effective = effective_limit(limit);

    let rows: Vec<Post> = match boundary {
        Some(boundary) => {
            sqlx::query_as::<_, Post>(
                r#"
                SELECT * FROM posts
                WHERE created_at < $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(boundary)
            .bind(effective + 1)
            .fetch_all(db)
            .await?
        }
        None => sqlx::query_as::<_, Post>("SELECT * FROM posts ORDER BY created_at DESC LIMIT $1")
            .bind(effective + 1)
            .fetch_all(db)
            .await?,
    };

    let (page, has_more) = trim_page(rows, effective as usize);

    // Prime both loaders in one bulk query each before per-post resolution.
    let creator_ids: Vec<i32> = page.iter().map(|post| post.creator_id).collect();
    let post_ids: Vec<i32> = page.iter().map(|post| post.id).collect();
    loaders.users.load_many(&creator_ids).await?;
    loaders.votes.load_many(&post_ids).await?;

    let mut posts = Vec::with_capacity(page.len());
    for post in page {
        let creator = loaders.users.load(post.creator_id).await?;
        let vote_status = loaders.votes.load(post.id).await?;

        let text_snippet = post.text_snippet(SNIPPET_LIMIT);

        posts.push(FeedPost {
            id: post.id,
            title: post.title,
            text_snippet,
            points: post.points,
            creator,
            vote_status,
            created_at: post.created_at,
        });
    }

    Ok(FeedPage { posts, has_more })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_through_millis() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(parse_cursor(&encode_cursor(ts)).unwrap(), ts);
    }

    #[test]
    fn malformed_cursor_is_rejected() {
        for bad in ["abc", "12.5", "", "16x0"] {
            match parse_cursor(bad) {
                Err(AppError::InvalidCursor(_)) => {}
                other => panic!("expected InvalidCursor for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn effective_limit_clamps_both_ends() {
        assert_eq!(effective_limit(20), 20);
        assert_eq!(effective_limit(50), 50);
        assert_eq!(effective_limit(500), 50);
        assert_eq!(effective_limit(0), 0);
        assert_eq!(effective_limit(-7), 0);
    }

    #[test]
    fn has_more_iff_store_returned_limit_plus_one() {
        let (page, has_more) = trim_page(vec![1, 2, 3], 2);
        assert_eq!(page, vec![1, 2]);
        assert!(has_more);

        let (page, has_more) = trim_page(vec![1, 2], 2);
        assert_eq!(page, vec![1, 2]);
        assert!(!has_more);
    }

    #[test]
    fn zero_limit_yields_empty_page() {
        let (page, has_more) = trim_page(vec![1], 0);
        assert!(page.is_empty());
        assert!(has_more);

        let (page, has_more) = trim_page(Vec::<i32>::new(), 0);
        assert!(page.is_empty());
        assert!(!has_more);
    }

    // Three posts at t=300,200,100 paged with limit 2: first page returns
    // 300 and 200 with more remaining, the cursor "200" yields the rest.
    #[test]
    fn two_page_walk_is_strictly_monotonic() {
        let stamps: Vec<DateTime<Utc>> = [300, 200, 100]
            .iter()
            .map(|&ms| Utc.timestamp_millis_opt(ms).unwrap())
            .collect();
        let limit = 2usize;

        let fetch = |boundary: Option<DateTime<Utc>>| -> Vec<DateTime<Utc>> {
            stamps
                .iter()
                .copied()
                .filter(|ts| boundary.map_or(true, |b| *ts < b))
                .take(limit + 1)
                .collect()
        };

        let (first, has_more) = trim_page(fetch(None), limit);
        assert_eq!(first, stamps[..2]);
        assert!(has_more);

        let cursor = encode_cursor(*first.last().unwrap());
        assert_eq!(cursor, "200");

        let boundary = parse_cursor(&cursor).unwrap();
        let (second, has_more) = trim_page(fetch(Some(boundary)), limit);
        assert_eq!(second, stamps[2..]);
        assert!(!has_more);

        let first_min = first.iter().min().unwrap();
        assert!(second.iter().all(|ts| ts < first_min));
    }
}
