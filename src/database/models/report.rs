use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

pub const STATUS_OPEN: &str = "open";
pub const STATUS_DISMISSED: &str = "dismissed";
pub const STATUS_ACTIONED: &str = "actioned";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub post_id: Uuid,
    pub reason: String,
    pub status: String,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Admin listing row: the report with its reporter and reported post.
#[derive(Debug, Clone, FromRow)]
pub struct ReportView {
    pub id: Uuid,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub reporter_id: Uuid,
    pub reporter_username: String,
    pub post_id: Uuid,
    pub post_body: String,
    pub post_author_id: Uuid,
    pub post_author_username: String,
    pub post_removed: bool,
    pub post_review_pending: bool,
}

impl ReportView {
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "reason": self.reason,
            "status": self.status,
            "created_at": self.created_at,
            "reporter": {
                "id": self.reporter_id,
                "username": self.reporter_username,
            },
            "post": {
                "id": self.post_id,
                "body": self.post_body,
                "author_id": self.post_author_id,
                "author_username": self.post_author_username,
                "removed": self.post_removed,
                "review_pending": self.post_review_pending,
            },
        })
    }
}

impl Report {
    /// Insert a report; the unique (reporter, post) key makes a duplicate
    /// come back as None instead of an error.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        reporter_id: Uuid,
        post_id: Uuid,
        reason: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO reports (reporter_id, post_id, reason)
            VALUES ($1, $2, $3)
            ON CONFLICT (reporter_id, post_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(reporter_id)
        .bind(post_id)
        .bind(reason)
        .fetch_optional(executor)
        .await
    }

    pub async fn count_for_post<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT count(*) FROM reports WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Report>, sqlx::Error> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportView>, sqlx::Error> {
        sqlx::query_as::<_, ReportView>(
            r#"
            SELECT r.id, r.reason, r.status, r.created_at,
                   ru.id AS reporter_id,
                   ru.username AS reporter_username,
                   p.id AS post_id,
                   p.body AS post_body,
                   au.id AS post_author_id,
                   au.username AS post_author_username,
                   (p.removed_at IS NOT NULL) AS post_removed,
                   p.review_pending AS post_review_pending
            FROM reports r
            JOIN users ru ON ru.id = r.reporter_id
            JOIN posts p ON p.id = r.post_id
            JOIN users au ON au.id = p.author_id
            WHERE ($1::text IS NULL OR r.status = $1)
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    /// Dismiss an open report. The status guard makes re-resolving a 404.
    pub async fn dismiss<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        admin_id: Uuid,
    ) -> Result<Option<Report>, sqlx::Error> {
        sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports SET status = 'dismissed', resolved_by = $2, resolved_at = now()
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .fetch_optional(executor)
        .await
    }

    /// Close every open report against a post as actioned. `resolved_by`
    /// stays NULL when automation did it.
    pub async fn action_all_for_post<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
        admin_id: Option<Uuid>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE reports SET status = 'actioned', resolved_by = $2, resolved_at = now()
            WHERE post_id = $1 AND status = 'open'
            "#,
        )
        .bind(post_id)
        .bind(admin_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
