// handlers/admin/stats.rs - GET /api/admin/stats

use axum::response::Json;
use serde_json::{json, Value};

use crate::database::Database;
use crate::error::ApiError;

/// Instance totals for the admin dashboard, one round trip.
pub async fn stats() -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    let (users, posts, open_reports, active_bans, review_queue): (i64, i64, i64, i64, i64) =
        sqlx::query_as(
            r#"
            SELECT
                (SELECT count(*) FROM users WHERE deleted_at IS NULL),
                (SELECT count(*) FROM posts
                    WHERE deleted_at IS NULL AND removed_at IS NULL),
                (SELECT count(*) FROM reports WHERE status = 'open'),
                (SELECT count(*) FROM bans
                    WHERE lifted_at IS NULL
                      AND (expires_at IS NULL OR expires_at > now())),
                (SELECT count(*) FROM posts
                    WHERE review_pending AND removed_at IS NULL AND deleted_at IS NULL)
            "#,
        )
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": users,
            "posts": posts,
            "open_reports": open_reports,
            "active_bans": active_bans,
            "review_queue": review_queue
        }
    })))
}
