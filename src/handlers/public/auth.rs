// handlers/public/auth.rs - POST /auth/register and POST /auth/login

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, password, Claims};
use crate::config;
use crate::database::models::{Ban, NewUser, User, ROLE_USER};
use crate::database::{is_unique_violation, Database};
use crate::error::ApiError;
use crate::validation::{self, ValidationErrors};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/**
 * POST /auth/register - Create an account
 *
 * Validates the payload field by field, hashes the password and inserts the
 * user. Username and email uniqueness is enforced by the database, so a
 * race between two identical registrations still yields exactly one 201
 * and one 409.
 */
pub async fn register(
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    if !config::config().security.allow_registration {
        return Err(ApiError::forbidden("Registration is currently disabled"));
    }

    let mut errors = ValidationErrors::new();
    validation::check_username(&mut errors, &req.username);
    validation::check_password(&mut errors, &req.password);
    if let Some(email) = req.email.as_deref() {
        validation::check_email(&mut errors, email);
    }
    validation::check_optional_text(&mut errors, "display_name", req.display_name.as_deref(), 100);
    errors.into_result()?;

    let password_hash = password::hash(&req.password)?;
    let pool = Database::pool().await?;

    let new_user = NewUser {
        username: &req.username,
        email: req.email.as_deref(),
        password_hash: &password_hash,
        display_name: req.display_name.as_deref(),
        role: ROLE_USER,
    };

    let user = match User::create(&pool, new_user).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Username or email is already taken"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("New account registered: '{}'", user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": user
        })),
    ))
}

/**
 * POST /auth/login - Exchange credentials for a bearer token
 *
 * Wrong username and wrong password produce the same 401 so the response
 * never reveals which half was wrong. Deactivated and banned accounts are
 * turned away here with the same errors the middleware would give them.
 */
pub async fn login(
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let pool = Database::pool().await?;

    let user = User::find_by_username(&pool, &req.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !password::verify(&req.password, &user.password_hash)? {
        tracing::warn!("Failed login attempt for '{}'", user.username);
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(ApiError::AccountDeactivated);
    }

    if let Some(ban) = Ban::active_for_user(&pool, user.id).await? {
        tracing::warn!("Banned user '{}' attempted login", user.username);
        return Err(ApiError::AccountBanned {
            reason: ban.reason,
            expires_at: ban.expires_at,
        });
    }

    let claims = Claims::new(user.id, user.username.clone(), user.role.clone());
    let token = auth::generate_token(&claims)?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "user": user
        }
    })))
}
