use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl Like {
    /// Idempotent like. Returns true when the row is new, false when the
    /// user had already liked the post.
    pub async fn like<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO likes (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unlike<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Users who liked a post, most recent first. Gone accounts drop out.
    pub async fn likers<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url
            FROM likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.post_id = $1 AND u.is_active AND u.deleted_at IS NULL
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }
}
