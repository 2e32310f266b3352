use axum::{extract::State, response::Json};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    handlers::auth::UserResponse,
    services::user_service,
};

pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>> {
    let user = user_service::get_user_by_id(&state.db, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}
