use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String, // session id
}

impl Claims {
    pub fn new(user_id: i32, username: String, jwt_secret: &str) -> Result<(String, Self)> {
        let now = Utc::now();
        let exp = now + Duration::hours(24);
        let jti = Uuid::new_v4().to_string();

        let claims = Self {
            sub: user_id.to_string(),
            username,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt_secret.as_ref()),
        )?;

        Ok((token, claims))
    }

    pub fn verify(token: &str, jwt_secret: &str) -> Result<Self> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_ref()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

/// Resolved viewer for the current request. Computed once at request entry
/// and passed by value into every operation that needs it.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub jti: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let claims = Claims::verify(bearer.token(), &state.config.jwt_secret)?;

        // The session must still be live server-side.
        if let Some(stored_user_id) = state.redis.get_session(&claims.jti).await? {
            if stored_user_id != claims.sub {
                return Err(AppError::Unauthorized("Invalid session".to_string()));
            }
        } else {
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }

        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            username: claims.username,
            jti: claims.jti,
        })
    }
}

// Optional auth user (for endpoints that work with or without a viewer)
#[derive(Debug)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl OptionalAuthUser {
    pub fn viewer_id(&self) -> Option<i32> {
        self.0.as_ref().map(|user| user.user_id)
    }
}

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(OptionalAuthUser(Some(user))),
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}

// Password hashing utilities
pub fn hash_password(password: &str) -> Result<String> {
    let cost = 12;
    bcrypt::hash(password, cost).map_err(AppError::from)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_round_trip() {
        let (token, claims) = Claims::new(42, "alice".to_string(), "test-secret").unwrap();
        let decoded = Claims::verify(&token, "test-secret").unwrap();

        assert_eq!(decoded.sub, "42");
        assert_eq!(decoded.username, "alice");
        assert_eq!(decoded.jti, claims.jti);
    }

    #[test]
    fn claims_reject_wrong_secret() {
        let (token, _) = Claims::new(42, "alice".to_string(), "test-secret").unwrap();
        assert!(Claims::verify(&token, "other-secret").is_err());
    }
}
