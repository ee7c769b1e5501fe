use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Mention {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl Mention {
    /// Resolve `@username` tokens to live accounts and record one mention
    /// each. The author mentioning themselves is dropped, as are names that
    /// match nobody. Returns how many mention rows were created.
    pub async fn record_all<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
        author_id: Uuid,
        usernames: &[String],
    ) -> Result<u64, sqlx::Error> {
        if usernames.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO mentions (post_id, user_id)
            SELECT $1, u.id FROM users u
            WHERE lower(u.username) = ANY($2)
              AND u.id <> $3
              AND u.is_active AND u.deleted_at IS NULL
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(usernames)
        .bind(author_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
