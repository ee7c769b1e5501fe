// handlers/protected/follows.rs - pending follow requests for private accounts
//
// GET    /api/follows/requests             incoming pending requests
// POST   /api/follows/requests/:id/accept
// DELETE /api/follows/requests/:id         reject

use axum::extract::{Extension, Path};
use axum::response::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::Pagination;
use crate::database::models::Follow;
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn requests(
    Extension(current): Extension<CurrentUser>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let requests = Follow::incoming_requests(&pool, current.id, page.limit, page.offset()).await?;
    let data: Vec<Value> = requests.iter().map(|r| r.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}

/// Only the request's target may accept it, and only while it is still
/// pending, so a request id leaking to another user is harmless.
pub async fn accept(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let edge = Follow::accept(&pool, id, current.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Follow request not found"))?;

    Ok(Json(json!({
        "success": true,
        "data": edge
    })))
}

pub async fn reject(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let rejected = Follow::reject(&pool, id, current.id).await?;
    if !rejected {
        return Err(ApiError::not_found("Follow request not found"));
    }

    Ok(Json(json!({
        "success": true,
        "data": { "rejected": true }
    })))
}
