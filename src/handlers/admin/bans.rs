// handlers/admin/bans.rs - banning users
//
// POST   /api/admin/users/:id/ban {reason, days?} permanent when days is absent
// DELETE /api/admin/users/:id/ban                 lift the active ban

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Ban, User};
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::validation::{self, ValidationErrors};

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub reason: String,
    pub days: Option<i64>,
}

/// Longest timed ban, ten years. Anything longer is a permanent ban
/// spelled with a number, and absurd values would overflow the expiry math.
pub const MAX_BAN_DAYS: i64 = 3650;

/**
 * POST /api/admin/users/:id/ban
 *
 * The ban takes effect on the target's next request; their current token
 * keeps failing in middleware until the ban expires or is lifted.
 */
pub async fn ban(
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<BanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let mut errors = ValidationErrors::new();
    validation::check_text(&mut errors, "reason", &req.reason, 500);
    if let Some(days) = req.days {
        if !(1..=MAX_BAN_DAYS).contains(&days) {
            errors.add("days", format!("must be between 1 and {}", MAX_BAN_DAYS));
        }
    }
    errors.into_result()?;

    let pool = Database::pool().await?;
    let target = User::find_by_id(&pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if target.is_admin() {
        return Err(ApiError::bad_request("Administrators cannot be banned"));
    }
    if Ban::active_for_user(&pool, target.id).await?.is_some() {
        return Err(ApiError::conflict("User already has an active ban"));
    }

    let expires_at = req.days.map(|days| Utc::now() + Duration::days(days));
    let ban = Ban::issue(&pool, target.id, current.id, req.reason.trim(), expires_at).await?;

    tracing::warn!(
        user = %target.username,
        by = %current.username,
        permanent = expires_at.is_none(),
        "User banned"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": ban
        })),
    ))
}

pub async fn lift(Path(user_id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let lifted = Ban::lift(&pool, user_id).await?;
    if !lifted {
        return Err(ApiError::not_found("No active ban for this user"));
    }

    Ok(Json(json!({
        "success": true,
        "data": { "lifted": true }
    })))
}
