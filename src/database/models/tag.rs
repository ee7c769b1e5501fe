use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// Aggregate row for the trending listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TagCount {
    pub tag: String,
    pub post_count: i64,
}

pub struct Tag;

impl Tag {
    /// Attach a set of already-normalized tags to a post.
    pub async fn attach_all<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
        tags: &[String],
    ) -> Result<u64, sqlx::Error> {
        if tags.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, tag)
            SELECT $1, t FROM unnest($2::text[]) AS t
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tags)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn for_post<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT tag FROM post_tags WHERE post_id = $1 ORDER BY tag")
            .bind(post_id)
            .fetch_all(executor)
            .await
    }

    /// Most-used tags over the last seven days. Only posts from public,
    /// live accounts count, so private activity never leaks into the list.
    pub async fn trending<'e>(
        executor: impl PgExecutor<'e>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TagCount>, sqlx::Error> {
        sqlx::query_as::<_, TagCount>(
            r#"
            SELECT t.tag, count(*) AS post_count
            FROM post_tags t
            JOIN posts p ON p.id = t.post_id
            JOIN users u ON u.id = p.author_id
            WHERE t.created_at > now() - interval '7 days'
              AND p.removed_at IS NULL AND p.deleted_at IS NULL
              AND u.is_active AND u.deleted_at IS NULL
              AND NOT u.is_private
            GROUP BY t.tag
            ORDER BY post_count DESC, t.tag ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }
}
