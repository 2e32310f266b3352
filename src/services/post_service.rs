use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    loaders::Loaders,
    models::{CreatePostRequest, Post, PostResponse, UpdatePostRequest},
};

pub async fn create_post(db: &PgPool, creator_id: i32, payload: &CreatePostRequest) -> Result<Post> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (title, text, creator_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.text)
    .bind(creator_id)
    .fetch_one(db)
    .await?;

    Ok(post)
}

pub async fn get_post(
    db: &PgPool,
    loaders: &mut Loaders,
    post_id: i32,
) -> Result<Option<PostResponse>> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(db)
        .await?;

    let Some(post) = post else {
        return Ok(None);
    };

    let creator = loaders.users.load(post.creator_id).await?;
    let vote_status = loaders.votes.load(post.id).await?;

    Ok(Some(PostResponse {
        id: post.id,
        title: post.title,
        text: post.text,
        points: post.points,
        creator,
        vote_status,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }))
}

// Ownership is enforced in the mutation predicate itself, not as a
// separate lookup. Zero rows affected covers both a missing post and a
// non-owner, and the error message keeps those indistinguishable.

pub async fn update_post(
    db: &PgPool,
    viewer_id: i32,
    post_id: i32,
    payload: &UpdatePostRequest,
) -> Result<Post> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = COALESCE($1, title),
            text = COALESCE($2, text),
            updated_at = now()
        WHERE id = $3 AND creator_id = $4
        RETURNING *
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.text)
    .bind(post_id)
    .bind(viewer_id)
    .fetch_optional(db)
    .await?;

    post.ok_or_else(|| AppError::Forbidden("Post not found or not yours to edit".to_string()))
}

pub async fn delete_post(db: &PgPool, viewer_id: i32, post_id: i32) -> Result<()> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND creator_id = $2")
        .bind(post_id)
        .bind(viewer_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Forbidden(
            "Post not found or not yours to delete".to_string(),
        ));
    }

    Ok(())
}
