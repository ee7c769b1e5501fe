// handlers/protected/messages.rs - direct messages
//
// GET  /api/messages                conversation list with unread counts
// GET  /api/messages/:username      thread with one user, newest first
// POST /api/messages/:username      send
// PUT  /api/messages/:username/read mark the thread's incoming messages read

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::api::Pagination;
use crate::config;
use crate::database::models::{Message, User};
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::validation::{self, ValidationErrors};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// Message peers are looked up ignoring `is_active`: a thread with a
/// deactivated account stays readable, it just cannot receive anything new.
async fn peer(pool: &PgPool, username: &str) -> Result<User, ApiError> {
    User::find_by_username(pool, username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn conversations(
    Extension(current): Extension<CurrentUser>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let conversations =
        Message::conversations(&pool, current.id, page.limit, page.offset()).await?;
    let data: Vec<Value> = conversations.iter().map(|c| c.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}

pub async fn thread(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let peer = peer(&pool, &username).await?;
    let messages = Message::thread(&pool, current.id, peer.id, page.limit, page.offset()).await?;

    Ok(Json(json!({
        "success": true,
        "data": messages,
        "meta": page.meta()
    })))
}

pub async fn send(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let mut errors = ValidationErrors::new();
    validation::check_text(
        &mut errors,
        "body",
        &req.body,
        config::config().content.max_message_chars,
    );
    errors.into_result()?;

    let pool = Database::pool().await?;
    let peer = peer(&pool, &username).await?;
    if peer.id == current.id {
        return Err(ApiError::bad_request("You cannot message yourself"));
    }
    if !peer.is_active {
        return Err(ApiError::forbidden("This account cannot receive messages"));
    }

    let message = Message::send(&pool, current.id, peer.id, &req.body).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": message
        })),
    ))
}

pub async fn read_thread(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let peer = peer(&pool, &username).await?;
    let updated = Message::mark_thread_read(&pool, current.id, peer.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "updated": updated }
    })))
}
