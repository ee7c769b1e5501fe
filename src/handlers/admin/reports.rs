// handlers/admin/reports.rs - report queue
//
// GET  /api/admin/reports?status=        reports with reporter and post context
// POST /api/admin/reports/:id/resolve    {action: "dismiss" | "remove_post"}

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::Pagination;
use crate::database::models::{report, Post, Report};
use crate::database::Database;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub action: String,
}

pub async fn list(
    Query(params): Query<ListParams>,
    page: Pagination,
) -> Result<Json<Value>, ApiError> {
    let status = params.status.as_deref();
    if let Some(status) = status {
        let known = [
            report::STATUS_OPEN,
            report::STATUS_DISMISSED,
            report::STATUS_ACTIONED,
        ];
        if !known.contains(&status) {
            return Err(ApiError::bad_request(
                "Status must be one of: open, dismissed, actioned",
            ));
        }
    }

    let pool = Database::pool().await?;
    let reports = Report::list(&pool, status, page.limit, page.offset()).await?;
    let data: Vec<Value> = reports.iter().map(|r| r.to_json()).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "meta": page.meta()
    })))
}

/**
 * POST /api/admin/reports/:id/resolve
 *
 * "dismiss" closes one report and leaves the post alone. "remove_post"
 * takes the post down and closes every open report against it, so the
 * queue never shows stale reports for content that is already gone.
 */
pub async fn resolve(
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_json(e.to_string()))?;
    let pool = Database::pool().await?;

    match req.action.as_str() {
        "dismiss" => {
            let report = Report::dismiss(&pool, id, current.id)
                .await?
                .ok_or_else(|| {
                    ApiError::not_found("Report not found or already resolved")
                })?;

            Ok(Json(json!({
                "success": true,
                "data": report
            })))
        }
        "remove_post" => {
            let report = Report::find_by_id(&pool, id)
                .await?
                .ok_or_else(|| ApiError::not_found("Report not found"))?;

            let mut tx = pool.begin().await?;
            // False when auto-moderation or another admin got there first;
            // the reports still close either way.
            let post_removed = Post::remove_for_moderation(&mut *tx, report.post_id).await?;
            let resolved = Report::action_all_for_post(&mut *tx, report.post_id, Some(current.id))
                .await?;
            tx.commit().await?;

            tracing::warn!(
                post = %report.post_id,
                by = %current.username,
                "Post removed by moderator"
            );

            Ok(Json(json!({
                "success": true,
                "data": {
                    "resolved": resolved,
                    "post_removed": post_removed
                }
            })))
        }
        _ => Err(ApiError::bad_request(
            "Action must be 'dismiss' or 'remove_post'",
        )),
    }
}
