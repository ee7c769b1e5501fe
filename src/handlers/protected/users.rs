// handlers/protected/users.rs - user search, profiles, self-service and follow edges
//
// GET    /api/users                     search by username or display name
// GET    /api/users/:username           public profile with counts
// PUT    /api/users/me                  partial profile update
// DELETE /api/users/me                  deactivate own account
// GET    /api/users/:username/posts     author timeline
// POST   /api/users/:username/follow    follow (pending for private targets)
// DELETE /api/users/:username/follow    unfollow / withdraw request
// GET    /api/users/:username/followers
// GET    /api/users/:username/following

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use url::Url;

use crate::api::Pagination;
use crate::config;
use crate::database::models::{Follow, Post, User};
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::validation::{self, ValidationErrors};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_private: Option<bool>,
}

/// Look up a username, treating deactivated and deleted accounts as absent.
async fn visible_target(pool: &PgPool, username: &str) -> Result<User, ApiError> {
    User::find_by_username(pool, username)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Private profiles expose their content only to the owner and to accepted
/// followers. The profile page itself stays visible; this gate covers the
/// post and follower listings.
async fn ensure_can_view(pool: &PgPool, viewer: &User, target: &User) -> Result<(), ApiError> {
    if target.is_private
        && target.id != viewer.id
        && !Follow::is_accepted(pool, viewer.id, target.id).await?
    {
        return Err(ApiError::forbidden("This account is private"));
    }
    Ok(())
}

pub async fn search(
    Query(params): Query<SearchParams>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::bad_request("Search term 'q' is required"));
    }

    let pool = Database::pool().await?;
    let users = User::search(&pool, query, page.limit, page.offset()).await?;

    Ok(Json(json!({
        "success": true,
        "data": users,
        "meta": page.meta()
    })))
}

/**
 * GET /api/users/:username - Profile with post / follower / following counts
 *
 * Never includes the email address; that only appears on the caller's own
 * whoami response.
 */
pub async fn profile(Path(username): Path<String>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let target = visible_target(&pool, &username).await?;
    let counts = User::profile_counts(&pool, target.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": target.id,
            "username": target.username,
            "display_name": target.display_name,
            "bio": target.bio,
            "avatar_url": target.avatar_url,
            "is_private": target.is_private,
            "created_at": target.created_at,
            "counts": counts
        }
    })))
}

pub async fn update_me(
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;

    let mut errors = ValidationErrors::new();
    validation::check_optional_text(&mut errors, "display_name", req.display_name.as_deref(), 100);
    validation::check_optional_text(
        &mut errors,
        "bio",
        req.bio.as_deref(),
        config::config().content.max_bio_chars,
    );
    if let Some(avatar_url) = req.avatar_url.as_deref() {
        if avatar_url.chars().count() > 2000 {
            errors.add("avatar_url", "must be at most 2000 characters");
        } else {
            match Url::parse(avatar_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                _ => errors.add("avatar_url", "must be a valid http(s) URL"),
            }
        }
    }
    errors.into_result()?;

    let pool = Database::pool().await?;
    let user = User::update_profile(
        &pool,
        current.id,
        req.display_name.as_deref(),
        req.bio.as_deref(),
        req.avatar_url.as_deref(),
        req.is_private,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({
        "success": true,
        "data": user
    })))
}

/**
 * DELETE /api/users/me - Deactivate the account
 *
 * Soft delete: the row stays so posts and messages keep their foreign keys,
 * but the account vanishes from lookups and the token stops working on the
 * next request.
 */
pub async fn delete_me(
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let deleted = User::soft_delete(&pool, current.id).await?;
    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!("Account deactivated: '{}'", current.username);

    Ok(Json(json!({
        "success": true,
        "data": { "deleted": true }
    })))
}

pub async fn user_posts(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let target = visible_target(&pool, &username).await?;
    ensure_can_view(&pool, &current, &target).await?;

    let posts = Post::by_author(&pool, target.id, page.limit, page.offset()).await?;
    let data: Vec<Value> = posts.iter().map(|p| p.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}

/**
 * POST /api/users/:username/follow
 *
 * Public targets are followed immediately; private targets get a pending
 * request they can accept or reject. Re-following is idempotent and returns
 * the existing edge.
 */
pub async fn follow(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let target = visible_target(&pool, &username).await?;
    if target.id == current.id {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let edge = Follow::request(&pool, current.id, target.id, target.is_private).await?;

    Ok(Json(json!({
        "success": true,
        "data": edge
    })))
}

pub async fn unfollow(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let target = visible_target(&pool, &username).await?;

    let removed = Follow::delete_between(&pool, current.id, target.id).await?;
    if !removed {
        return Err(ApiError::not_found("You are not following this user"));
    }

    Ok(Json(json!({
        "success": true,
        "data": { "unfollowed": true }
    })))
}

pub async fn followers(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let target = visible_target(&pool, &username).await?;
    ensure_can_view(&pool, &current, &target).await?;

    let users = Follow::followers(&pool, target.id, page.limit, page.offset()).await?;

    Ok(Json(json!({
        "success": true,
        "data": users,
        "meta": page.meta()
    })))
}

pub async fn following(
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let target = visible_target(&pool, &username).await?;
    ensure_can_view(&pool, &current, &target).await?;

    let users = Follow::following(&pool, target.id, page.limit, page.offset()).await?;

    Ok(Json(json!({
        "success": true,
        "data": users,
        "meta": page.meta()
    })))
}
