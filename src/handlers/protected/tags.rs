// handlers/protected/tags.rs - hashtags
//
// GET /api/tags/trending    most-used tags of the last seven days
// GET /api/tags/:name/posts visible posts carrying a tag

use axum::extract::{Extension, Path};
use axum::response::Json;
use serde_json::{json, Value};

use crate::api::Pagination;
use crate::database::models::{Post, Tag};
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn trending(page: Pagination) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let tags = Tag::trending(&pool, page.limit, page.offset()).await?;

    Ok(Json(json!({
        "success": true,
        "data": tags,
        "meta": page.meta()
    })))
}

pub async fn posts_for_tag(
    Extension(current): Extension<CurrentUser>,
    Path(name): Path<String>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    // Tags are stored lower-cased, so the lookup is case-insensitive.
    let tag = name.trim().to_lowercase();
    if tag.is_empty() || tag.chars().count() > 100 {
        return Err(ApiError::bad_request("Invalid tag name"));
    }

    let pool = Database::pool().await?;
    let posts = Post::by_tag(&pool, &tag, current.id, page.limit, page.offset()).await?;
    let data: Vec<Value> = posts.iter().map(|p| p.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}
