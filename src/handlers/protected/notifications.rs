// handlers/protected/notifications.rs - the unified notification feed
//
// GET  /api/notifications              merged feed (likes, mentions, follows, DMs)
// GET  /api/notifications/unread-count
// POST /api/notifications/read-all

use axum::extract::Extension;
use axum::response::Json;
use serde_json::{json, Value};

use crate::api::Pagination;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::notification_service::NotificationService;

pub async fn list(
    Extension(current): Extension<CurrentUser>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let service = NotificationService::new().await?;
    let notifications = service.page_for(current.id, page).await?;
    let data: Vec<Value> = notifications.iter().map(|n| n.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}

pub async fn unread_count(
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let service = NotificationService::new().await?;
    let counts = service.unread_counts(current.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "unread": counts.total(),
            "by_source": counts
        }
    })))
}

pub async fn read_all(
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let service = NotificationService::new().await?;
    let updated = service.mark_all_read(current.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "updated": updated }
    })))
}
