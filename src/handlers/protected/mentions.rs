// handlers/protected/mentions.rs - GET /api/mentions

use axum::extract::Extension;
use axum::response::Json;
use serde_json::{json, Value};

use crate::api::Pagination;
use crate::database::models::Post;
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Visible posts that mention the caller, newest first. Mentions inside
/// posts that were deleted or removed since do not show up.
pub async fn list(
    Extension(current): Extension<CurrentUser>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let posts = Post::mentioning(&pool, current.id, page.limit, page.offset()).await?;
    let data: Vec<Value> = posts.iter().map(|p| p.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}
