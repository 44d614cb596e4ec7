use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{password, token};
use crate::config::AuthConfig;
use crate::error::{ApiError, ErrorCode};
use crate::models::{PublicUser, Role, User};

#[derive(Debug, Deserialize, Validate)]
pub struct SignUp {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Login {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub token: String,
}

pub async fn signup(db: &PgPool, data: SignUp) -> Result<(), ApiError> {
    let existing = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(&data.email)
        .fetch_one(db)
        .await?;
    if existing {
        return Err(ApiError::bad_request(
            ErrorCode::UserAlreadyExists,
            "User already exists!",
        ));
    }

    let password_hash = password::hash_password(&data.password)?;
    let user_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&password_hash)
    .bind(Role::Customer.as_str())
    .execute(db)
    .await?;

    info!(user_id = %user_id, "user signed up");
    Ok(())
}

pub async fn login(db: &PgPool, config: &AuthConfig, data: Login) -> Result<LoginResponse, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&data.email)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound, "User does not exist!"))?;

    if !password::verify_password(&data.password, &user.password_hash)? {
        return Err(ApiError::bad_request(
            ErrorCode::IncorrectPassword,
            "Incorrect password",
        ));
    }

    let role = user
        .role()
        .ok_or_else(|| ApiError::Internal(format!("user {} has unknown role", user.id)))?;
    let token = token::issue(user.id, role, &config.jwt_secret, config.token_ttl_secs)?;

    let public = user
        .to_public()
        .ok_or_else(|| ApiError::Internal("user has unknown role".to_string()))?;

    Ok(LoginResponse {
        user: public,
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_payload_rejects_short_password() {
        let data = SignUp {
            name: "Regular User".to_string(),
            email: "user@example.com".to_string(),
            password: "12345".to_string(),
        };
        assert!(data.validate().is_err());
    }

    #[test]
    fn login_payload_rejects_invalid_email() {
        let data = Login {
            email: "not-an-email".to_string(),
            password: "123456".to_string(),
        };
        assert!(data.validate().is_err());
    }

    #[test]
    fn valid_signup_payload_passes() {
        let data = SignUp {
            name: "Regular User".to_string(),
            email: "user@example.com".to_string(),
            password: "123456".to_string(),
        };
        assert!(data.validate().is_ok());
    }
}
