use std::collections::HashMap;

use sqlx::PgPool;

use crate::{error::Result, models::PostCreator};

/// Request-scoped loader set. Constructed fresh for every inbound request
/// and passed by `&mut` into enrichment code; never shared across requests,
/// so memoized rows cannot go stale between operations.
pub struct Loaders {
    pub users: UserLoader,
    pub votes: VoteLoader,
}

impl Loaders {
    pub fn new(db: PgPool, viewer_id: Option<i32>) -> Self {
        Self {
            users: UserLoader::new(db.clone()),
            votes: VoteLoader::new(db, viewer_id),
        }
    }
}

// Ids not yet memoized, deduplicated in first-seen order. Keeps the
// at-most-one-fetch-per-id guarantee in one place for both loaders.
fn ids_to_fetch<V>(cache: &HashMap<i32, V>, requested: &[i32]) -> Vec<i32> {
    let mut missing = Vec::new();
    for &id in requested {
        if !cache.contains_key(&id) && !missing.contains(&id) {
            missing.push(id);
        }
    }
    missing
}

/// Coalesces "user by id" lookups into one bulk query per request.
/// Unresolved ids memoize as `None` rather than erroring.
pub struct UserLoader {
    db: PgPool,
    cache: HashMap<i32, Option<PostCreator>>,
}

impl UserLoader {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            cache: HashMap::new(),
        }
    }

    /// Primes the cache for every id in one round trip.
    pub async fn load_many(&mut self, ids: &[i32]) -> Result<()> {
        let missing = ids_to_fetch(&self.cache, ids);
        if missing.is_empty() {
            return Ok(());
        }

        let rows =
            sqlx::query_as::<_, PostCreator>("SELECT id, username FROM users WHERE id = ANY($1)")
                .bind(&missing)
                .fetch_all(&self.db)
                .await?;

        for row in rows {
            self.cache.insert(row.id, Some(row));
        }
        for id in missing {
            self.cache.entry(id).or_insert(None);
        }

        Ok(())
    }

    pub async fn load(&mut self, id: i32) -> Result<Option<PostCreator>> {
        if !self.cache.contains_key(&id) {
            self.load_many(&[id]).await?;
        }
        Ok(self.cache.get(&id).cloned().flatten())
    }
}

/// Coalesces "this viewer's vote by post id" lookups. Specialized to one
/// viewer at construction; with no viewer every post reports `None`
/// without touching the store.
pub struct VoteLoader {
    db: PgPool,
    viewer_id: Option<i32>,
    cache: HashMap<i32, Option<i16>>,
}

impl VoteLoader {
    pub fn new(db: PgPool, viewer_id: Option<i32>) -> Self {
        Self {
            db,
            viewer_id,
            cache: HashMap::new(),
        }
    }

    pub async fn load_many(&mut self, post_ids: &[i32]) -> Result<()> {
        let Some(viewer_id) = self.viewer_id else {
            for &id in post_ids {
                self.cache.entry(id).or_insert(None);
            }
            return Ok(());
        };

        let missing = ids_to_fetch(&self.cache, post_ids);
        if missing.is_empty() {
            return Ok(());
        }

        let rows: Vec<(i32, i16)> = sqlx::query_as(
            "SELECT post_id, value FROM upvotes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(viewer_id)
        .bind(&missing)
        .fetch_all(&self.db)
        .await?;

        for (post_id, value) in rows {
            self.cache.insert(post_id, Some(value));
        }
        for id in missing {
            self.cache.entry(id).or_insert(None);
        }

        Ok(())
    }

    pub async fn load(&mut self, post_id: i32) -> Result<Option<i16>> {
        if !self.cache.contains_key(&post_id) {
            self.load_many(&[post_id]).await?;
        }
        Ok(self.cache.get(&post_id).copied().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_to_fetch_deduplicates_requests() {
        let cache: HashMap<i32, Option<i16>> = HashMap::new();
        assert_eq!(ids_to_fetch(&cache, &[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn ids_to_fetch_skips_memoized_ids() {
        let mut cache: HashMap<i32, Option<i16>> = HashMap::new();
        cache.insert(1, Some(1));
        cache.insert(2, None); // not-found is memoized too

        assert_eq!(ids_to_fetch(&cache, &[1, 2, 3]), vec![3]);
    }

    #[test]
    fn ids_to_fetch_empty_when_all_cached() {
        let mut cache: HashMap<i32, Option<i16>> = HashMap::new();
        cache.insert(7, None);

        assert!(ids_to_fetch(&cache, &[7, 7]).is_empty());
    }
}
