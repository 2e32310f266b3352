use sqlx::PgPool;

use crate::{
    auth::{hash_password, verify_password},
    error::{AppError, FieldError, Result},
    models::User,
};

pub async fn register(db: &PgPool, username: &str, email: &str, password: &str) -> Result<User> {
    let password_hash = hash_password(password)?;

    // Duplicate username/email surfaces as Conflict through the store
    // boundary rather than a racy check-then-insert.
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn login(db: &PgPool, username_or_email: &str, password: &str) -> Result<User> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1 OR email = $1")
            .bind(username_or_email)
            .fetch_optional(db)
            .await?;

    let Some(user) = user else {
        return Err(AppError::Validation(vec![FieldError::new(
            "username_or_email",
            "that account doesn't exist",
        )]));
    };

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::Validation(vec![FieldError::new(
            "password",
            "incorrect password",
        )]));
    }

    Ok(user)
}

pub async fn get_user_by_id(db: &PgPool, user_id: i32) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn get_user_by_email(db: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn change_password(db: &PgPool, user_id: i32, new_password: &str) -> Result<()> {
    let password_hash = hash_password(new_password)?;

    let result = sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(&password_hash)
        .bind(user_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(())
}
