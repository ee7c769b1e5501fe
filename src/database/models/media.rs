use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Media {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub media_type: String,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Media {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        owner_id: Uuid,
        url: &str,
        media_type: &str,
        alt_text: Option<&str>,
    ) -> Result<Media, sqlx::Error> {
        sqlx::query_as::<_, Media>(
            r#"
            INSERT INTO media (owner_id, url, media_type, alt_text)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(url)
        .bind(media_type)
        .bind(alt_text)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Media>, sqlx::Error> {
        sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Link media to a post. Only media the author owns attaches; foreign
    /// ids in the list are silently skipped.
    pub async fn attach_to_post<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
        media_ids: &[Uuid],
        owner_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        if media_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO post_media (post_id, media_id)
            SELECT $1, m.id FROM media m
            WHERE m.id = ANY($2) AND m.owner_id = $3
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(media_ids)
        .bind(owner_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn for_post<'e>(
        executor: impl PgExecutor<'e>,
        post_id: Uuid,
    ) -> Result<Vec<Media>, sqlx::Error> {
        sqlx::query_as::<_, Media>(
            r#"
            SELECT m.* FROM media m
            JOIN post_media pm ON pm.media_id = m.id
            WHERE pm.post_id = $1
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(executor)
        .await
    }

    /// True when the media hangs off at least one visible post.
    pub async fn attached_to_visible_post<'e>(
        executor: impl PgExecutor<'e>,
        media_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM post_media pm
                JOIN posts p ON p.id = pm.post_id
                WHERE pm.media_id = $1 AND p.removed_at IS NULL AND p.deleted_at IS NULL
            )
            "#,
        )
        .bind(media_id)
        .fetch_one(executor)
        .await?;
        Ok(exists.0)
    }
}
