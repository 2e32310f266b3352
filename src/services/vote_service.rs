use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    models::Upvote,
};

/// Sign normalization for raw vote input: zero and positive values count as
/// an upvote (+1), negative values as a downvote (-1). This matches the
/// caller-facing contract where anything other than a negative value is an
/// upvote, so `0` is deliberately an upvote.
pub fn normalize_vote(raw_value: i32) -> i16 {
    if raw_value < 0 { -1 } else { 1 }
}

/// Score delta implied by a vote against the existing ledger row.
/// No row: the full value. Same value: a no-op re-vote. Flipped value:
/// twice the new value, removing the old vote and applying the new one in
/// one step.
pub fn vote_delta(existing: Option<i16>, value: i16) -> Option<i32> {
    match existing {
        None => Some(value as i32),
        Some(current) if current == value => None,
        Some(_) => Some(2 * value as i32),
    }
}

/// Records or changes the viewer's vote and adjusts `posts.points` as one
/// atomic unit. Either the ledger row and the point adjustment both land,
/// or neither does.
pub async fn vote_post(db: &PgPool, viewer_id: i32, post_id: i32, raw_value: i32) -> Result<bool> {
    let value = normalize_vote(raw_value);

    let mut tx = db.begin().await?;

    // Lock the post row first: concurrent votes on the same post serialize
    // here, and a missing post aborts before any ledger write.
    let post_exists: Option<i32> =
        sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;

    if post_exists.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let existing = sqlx::query_as::<_, Upvote>(
        "SELECT * FROM upvotes WHERE user_id = $1 AND post_id = $2",
    )
    .bind(viewer_id)
    .bind(post_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(delta) = vote_delta(existing.as_ref().map(|vote| vote.value), value) else {
        // Re-vote with the same value: idempotent success, nothing written.
        return Ok(true);
    };

    if existing.is_none() {
        sqlx::query("INSERT INTO upvotes (user_id, post_id, value) VALUES ($1, $2, $3)")
            .bind(viewer_id)
            .bind(post_id)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query(
            "UPDATE upvotes SET value = $3, updated_at = now() WHERE user_id = $1 AND post_id = $2",
        )
        .bind(viewer_id)
        .bind(post_id)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE posts SET points = points + $1 WHERE id = $2")
        .bind(delta)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn zero_and_positive_normalize_to_upvote() {
        assert_eq!(normalize_vote(0), 1);
        assert_eq!(normalize_vote(1), 1);
        assert_eq!(normalize_vote(7), 1);
        assert_eq!(normalize_vote(i32::MAX), 1);
    }

    #[test]
    fn negatives_normalize_to_downvote() {
        assert_eq!(normalize_vote(-1), -1);
        assert_eq!(normalize_vote(-42), -1);
        assert_eq!(normalize_vote(i32::MIN), -1);
    }

    #[test]
    fn delta_rules_match_ledger_policy() {
        assert_eq!(vote_delta(None, 1), Some(1));
        assert_eq!(vote_delta(None, -1), Some(-1));
        assert_eq!(vote_delta(Some(1), 1), None);
        assert_eq!(vote_delta(Some(-1), -1), None);
        assert_eq!(vote_delta(Some(1), -1), Some(-2));
        assert_eq!(vote_delta(Some(-1), 1), Some(2));
    }

    // Replays a vote sequence through the same normalize + delta rules the
    // transaction applies, tracking points and the one-row-per-pair ledger.
    fn replay(votes: &[(i32, i32)]) -> (i32, HashMap<i32, i16>) {
        let mut points = 0;
        let mut ledger: HashMap<i32, i16> = HashMap::new();

        for &(user, raw) in votes {
            let value = normalize_vote(raw);
            if let Some(delta) = vote_delta(ledger.get(&user).copied(), value) {
                points += delta;
                ledger.insert(user, value);
            }
        }

        (points, ledger)
    }

    #[test]
    fn vote_flip_applies_double_delta() {
        // A upvotes, A flips to downvote, B upvotes.
        let (points, ledger) = replay(&[(1, 1), (1, -1), (2, 1)]);
        assert_eq!(points, 0);
        assert_eq!(ledger[&1], -1);
        assert_eq!(ledger[&2], 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn revote_is_idempotent() {
        let (points, ledger) = replay(&[(1, 1), (1, 1), (1, 1)]);
        assert_eq!(points, 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn final_vote_equals_sign_of_last_vote() {
        let sequences: &[&[i32]] = &[&[1, -1, 1], &[0, -5, 3], &[-1, -1, 4, -2]];

        for seq in sequences {
            let votes: Vec<(i32, i32)> = seq.iter().map(|&raw| (1, raw)).collect();
            let (points, ledger) = replay(&votes);

            let expected = normalize_vote(*seq.last().unwrap());
            assert_eq!(ledger[&1], expected);
            assert_eq!(ledger.len(), 1);
            // One user, one ledger row: points equal the surviving vote.
            assert_eq!(points, expected as i32);
        }
    }

    #[test]
    fn step_by_step_scenario_matches_documented_deltas() {
        // points = 0; A votes +1 -> 1; A votes -1 -> -1; B votes +1 -> 0.
        let (after_a_up, _) = replay(&[(1, 1)]);
        assert_eq!(after_a_up, 1);

        let (after_a_flip, _) = replay(&[(1, 1), (1, -1)]);
        assert_eq!(after_a_flip, -1);

        let (after_b_up, _) = replay(&[(1, 1), (1, -1), (2, 1)]);
        assert_eq!(after_b_up, 0);
    }
}
