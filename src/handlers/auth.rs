use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, Claims},
    error::{AppError, FieldError, Result},
    models::User,
    services::user_service,
};

const SESSION_TTL_SECONDS: usize = 86400;
const RESET_TOKEN_TTL_SECONDS: usize = 3600;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    payload.validate()?;

    // A username with '@' would be ambiguous against email login.
    if payload.username.contains('@') {
        return Err(AppError::Validation(vec![FieldError::new(
            "username",
            "username cannot contain @",
        )]));
    }

    let rate_limit_key = format!("register_attempt:{}", payload.email);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 5, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let user = user_service::register(&state.db, &payload.username, &payload.email, &payload.password)
        .await?;

    let (token, claims) = Claims::new(user.id, user.username.clone(), &state.config.jwt_secret)?;
    state
        .redis
        .store_session(&claims.jti, &user.id.to_string(), SESSION_TTL_SECONDS)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": UserResponse::from(user)
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let rate_limit_key = format!("login_attempt:{}", payload.username_or_email);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 10, 900)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let user = user_service::login(&state.db, &payload.username_or_email, &payload.password).await?;

    let (token, claims) = Claims::new(user.id, user.username.clone(), &state.config.jwt_secret)?;
    state
        .redis
        .store_session(&claims.jti, &user.id.to_string(), SESSION_TTL_SECONDS)
        .await?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": UserResponse::from(user)
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>> {
    state.redis.delete_session(&auth_user.jti).await?;

    Ok(Json(json!({
        "message": "Logout successful"
    })))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    let rate_limit_key = format!("forgot_password:{}", payload.email);
    if !state
        .redis
        .check_rate_limit(&rate_limit_key, 3, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    if let Some(user) = user_service::get_user_by_email(&state.db, &payload.email).await? {
        let token = Uuid::new_v4().to_string();
        state
            .redis
            .store_reset_token(&token, &user.id.to_string(), RESET_TOKEN_TTL_SECONDS)
            .await?;

        let reset_link = format!("{}/reset-password/{}", state.config.frontend_url, token);
        let email_service = state.email_service.clone();
        // Fire and forget: mail delivery never blocks or fails the request.
        tokio::spawn(async move {
            if let Err(e) = email_service.send_password_reset(&user.email, &reset_link).await {
                tracing::error!("Failed to send password reset email: {:?}", e);
            }
        });
    }

    // Same response whether or not the email exists.
    Ok(Json(json!({
        "message": "If the email exists, a password reset link has been sent"
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    let user_id = state
        .redis
        .take_reset_token(&payload.token)
        .await?
        .and_then(|id| id.parse::<i32>().ok())
        .ok_or_else(|| {
            AppError::Validation(vec![FieldError::new("token", "token invalid or expired")])
        })?;

    user_service::change_password(&state.db, user_id, &payload.new_password).await?;

    let user = user_service::get_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // Log the user in with their fresh credentials.
    let (token, claims) = Claims::new(user.id, user.username.clone(), &state.config.jwt_secret)?;
    state
        .redis
        .store_session(&claims.jti, &user.id.to_string(), SESSION_TTL_SECONDS)
        .await?;

    Ok(Json(json!({
        "message": "Password reset successfully",
        "token": token,
        "user": UserResponse::from(user)
    })))
}
