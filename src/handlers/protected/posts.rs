// handlers/protected/posts.rs - posting, timelines, likes and reports
//
// POST   /api/posts            create (mentions, hashtags and media extracted here)
// GET    /api/posts            home timeline
// GET    /api/posts/:id        single post with tags and media
// DELETE /api/posts/:id        author or admin, soft delete
// POST   /api/posts/:id/like   idempotent like
// DELETE /api/posts/:id/like   idempotent unlike
// GET    /api/posts/:id/likes  liking users
// POST   /api/posts/:id/report file a report, may trigger auto-moderation

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::Pagination;
use crate::config;
use crate::content;
use crate::database::models::{Like, Media, Mention, Post, PostView, Tag};
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::moderation_service::ModerationService;
use crate::validation::{self, ValidationErrors};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
    pub reply_to: Option<Uuid>,
    pub media_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub reason: String,
}

/// Single post as the API returns it: the view row plus its tags and media.
async fn post_with_attachments(pool: &PgPool, view: &PostView) -> Result<Value, ApiError> {
    let tags = Tag::for_post(pool, view.id).await?;
    let media = Media::for_post(pool, view.id).await?;

    let mut data = view.to_json();
    data["tags"] = json!(tags);
    data["media"] = json!(media);
    Ok(data)
}

/**
 * POST /api/posts - Create a post
 *
 * Mentions and hashtags are parsed out of the body and recorded in the same
 * transaction as the post itself, so a post never exists half-indexed.
 * Mentions of unknown or inactive usernames are dropped silently; media ids
 * the caller does not own are skipped.
 */
pub async fn create(
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let mut errors = ValidationErrors::new();
    validation::check_text(&mut errors, "body", &req.body, config::config().content.max_post_chars);
    errors.into_result()?;

    let pool = Database::pool().await?;

    if let Some(reply_to) = req.reply_to {
        Post::find_visible(&pool, reply_to)
            .await?
            .ok_or_else(|| ApiError::not_found("Reply target not found"))?;
    }

    let mentions = content::extract_mentions(&req.body);
    let hashtags = content::extract_hashtags(&req.body);
    let media_ids = req.media_ids.unwrap_or_default();

    let mut tx = pool.begin().await?;
    let post = Post::create(&mut *tx, current.id, &req.body, req.reply_to).await?;
    Mention::record_all(&mut *tx, post.id, current.id, &mentions).await?;
    Tag::attach_all(&mut *tx, post.id, &hashtags).await?;
    Media::attach_to_post(&mut *tx, post.id, &media_ids, current.id).await?;
    tx.commit().await?;

    let view = Post::view_for(&pool, post.id, current.id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Failed to load created post"))?;
    let data = post_with_attachments(&pool, &view).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": data
        })),
    ))
}

/// Home timeline: the caller's own posts plus posts from accounts they
/// follow with an accepted edge, newest first.
pub async fn timeline(
    Extension(current): Extension<CurrentUser>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let posts = Post::home_timeline(&pool, current.id, page.limit, page.offset()).await?;
    let data: Vec<Value> = posts.iter().map(|p| p.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}

pub async fn show(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let view = Post::view_for(&pool, id, current.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    let data = post_with_attachments(&pool, &view).await?;

    Ok(Json(json!({
        "success": true,
        "data": data
    })))
}

pub async fn delete(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let post = Post::find_visible(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if post.author_id != current.id && !current.is_admin() {
        return Err(ApiError::forbidden("You can only delete your own posts"));
    }

    Post::soft_delete(&pool, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "deleted": true }
    })))
}

pub async fn like(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    // view_for applies the privacy gate, so nobody likes a post they
    // cannot read.
    Post::view_for(&pool, id, current.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Like::like(&pool, current.id, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "liked": true }
    })))
}

pub async fn unlike(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    Like::unlike(&pool, current.id, id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "liked": false }
    })))
}

pub async fn likers(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    Post::view_for(&pool, id, current.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let users = Like::likers(&pool, id, page.limit, page.offset()).await?;

    Ok(Json(json!({
        "success": true,
        "data": users,
        "meta": page.meta()
    })))
}

/**
 * POST /api/posts/:id/report - Report a post
 *
 * The moderation outcome (review flag, automatic removal) is deliberately
 * not echoed back to the reporter; admins see it on the reports listing.
 */
pub async fn report(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let mut errors = ValidationErrors::new();
    validation::check_text(
        &mut errors,
        "reason",
        &req.reason,
        config::config().content.max_report_reason_chars,
    );
    errors.into_result()?;

    let service = ModerationService::new().await?;
    service.submit_report(current.id, id, &req.reason).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": { "reported": true }
        })),
    ))
}
