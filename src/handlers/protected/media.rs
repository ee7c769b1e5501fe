// handlers/protected/media.rs - media registration
//
// POST /api/media     register an uploaded file by URL
// GET  /api/media/:id fetch own media, or media attached to a visible post

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Json;
use mime::Mime;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::database::models::Media;
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::validation::{self, ValidationErrors};

#[derive(Debug, Deserialize)]
pub struct CreateMediaRequest {
    pub url: String,
    pub media_type: String,
    pub alt_text: Option<String>,
}

/**
 * POST /api/media - Register media
 *
 * Files live on external storage; this records the URL and content type so
 * posts can reference them. Only image and video content types are accepted.
 */
pub async fn create(
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<CreateMediaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let mut errors = ValidationErrors::new();
    match Url::parse(req.url.trim()) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => errors.add("url", "must be a valid http(s) URL"),
    }
    match req.media_type.parse::<Mime>() {
        Ok(mime) if mime.type_() == mime::IMAGE || mime.type_() == mime::VIDEO => {}
        _ => errors.add("media_type", "must be an image/* or video/* type"),
    }
    validation::check_optional_text(&mut errors, "alt_text", req.alt_text.as_deref(), 500);
    errors.into_result()?;

    let pool = Database::pool().await?;
    let media = Media::create(
        &pool,
        current.id,
        req.url.trim(),
        &req.media_type,
        req.alt_text.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": media
        })),
    ))
}

pub async fn show(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let media = Media::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Media not found"))?;

    // Unpublished media is private to its owner; a 404 rather than a 403
    // keeps foreign ids unguessable.
    if media.owner_id != current.id && !Media::attached_to_visible_post(&pool, id).await? {
        return Err(ApiError::not_found("Media not found"));
    }

    Ok(Json(json!({
        "success": true,
        "data": media
    })))
}
