use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::{AppError, Result},
    loaders::Loaders,
    models::{CreatePostRequest, FeedPage, PostResponse, UpdatePostRequest, VoteRequest},
    services::{feed_service, post_service, vote_service},
};

#[derive(Debug, Deserialize)]
pub struct GetPostsQuery {
    pub limit: Option<i32>,
    pub cursor: Option<String>,
}

pub async fn get_posts(
    State(state): State<AppState>,
    Query(params): Query<GetPostsQuery>,
    auth_user: OptionalAuthUser,
) -> Result<Json<FeedPage>> {
    let limit = params.limit.unwrap_or(20);

    let mut loaders = Loaders::new(state.db.clone(), auth_user.viewer_id());
    let page =
        feed_service::get_feed(&state.db, &mut loaders, limit, params.cursor.as_deref()).await?;

    Ok(Json(page))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    auth_user: OptionalAuthUser,
) -> Result<Json<PostResponse>> {
    let mut loaders = Loaders::new(state.db.clone(), auth_user.viewer_id());

    let post = post_service::get_post(&state.db, &mut loaders, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    payload.validate()?;

    let rate_limit_key = format!("create_post:{}", auth_user.user_id);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 10, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let post = post_service::create_post(&state.db, auth_user.user_id, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully",
            "post": post
        })),
    ))
}

pub async fn update_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i32>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    let post = post_service::update_post(&state.db, auth_user.user_id, post_id, &payload).await?;

    Ok(Json(json!({
        "message": "Post updated successfully",
        "post": post
    })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i32>,
) -> Result<Json<Value>> {
    post_service::delete_post(&state.db, auth_user.user_id, post_id).await?;

    Ok(Json(json!({
        "message": "Post deleted successfully"
    })))
}

pub async fn vote_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<i32>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<Value>> {
    let rate_limit_key = format!("vote_post:{}", auth_user.user_id);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 100, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let success =
        vote_service::vote_post(&state.db, auth_user.user_id, post_id, payload.value).await?;

    Ok(Json(json!({
        "success": success
    })))
}
