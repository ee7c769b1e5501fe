use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// Raw posts row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub reply_to: Option<Uuid>,
    pub review_pending: bool,
    pub removed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post joined with its author plus like/reply totals, the shape every
/// feed endpoint returns.
#[derive(Debug, Clone, FromRow)]
pub struct PostView {
    pub id: Uuid,
    pub body: String,
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub like_count: i64,
    pub reply_count: i64,
}

const SELECT_VIEW: &str = r#"
    SELECT p.id, p.body, p.reply_to, p.created_at, p.updated_at,
           u.id AS author_id,
           u.username AS author_username,
           u.display_name AS author_display_name,
           u.avatar_url AS author_avatar_url,
           (SELECT count(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
           (SELECT count(*) FROM posts r
             WHERE r.reply_to = p.id AND r.removed_at IS NULL AND r.deleted_at IS NULL) AS reply_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

// A post is visible when neither moderation nor its author took it down and
// the author account is still live.
const VISIBLE: &str =
    "p.removed_at IS NULL AND p.deleted_at IS NULL AND u.is_active AND u.deleted_at IS NULL";

impl PostView {
    /// Envelope shape: author fields folded into a nested object.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "body": self.body,
            "reply_to": self.reply_to,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "author": {
                "id": self.author_id,
                "username": self.author_username,
                "display_name": self.author_display_name,
                "avatar_url": self.author_avatar_url,
            },
            "like_count": self.like_count,
            "reply_count": self.reply_count,
        })
    }
}

impl Post {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        author_id: Uuid,
        body: &str,
        reply_to: Option<Uuid>,
    ) -> Result<Post, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (author_id, body, reply_to)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(author_id)
        .bind(body)
        .bind(reply_to)
        .fetch_one(executor)
        .await
    }

    /// Raw visible row, no author-state or privacy checks. Used where the
    /// caller authorizes separately (delete, report, reply target).
    pub async fn find_visible<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE id = $1 AND removed_at IS NULL AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Single post as the viewer sees it: visible, live author, and private
    /// authors only for themselves or accepted followers.
    pub async fn view_for<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        viewer_id: Uuid,
    ) -> Result<Option<PostView>, sqlx::Error> {
        let sql = format!(
            r#"{} WHERE {} AND p.id = $1
               AND (NOT u.is_private OR u.id = $2 OR EXISTS (
                   SELECT 1 FROM follows f
                   WHERE f.source_id = $2 AND f.target_id = u.id AND f.state = 'accepted'))"#,
            SELECT_VIEW, VISIBLE
        );
        sqlx::query_as::<_, PostView>(&sql)
            .bind(id)
            .bind(viewer_id)
            .fetch_optional(executor)
            .await
    }

    /// My posts plus posts of everyone I follow (accepted), newest first.
    pub async fn home_timeline<'e>(
        executor: impl PgExecutor<'e>,
        viewer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostView>, sqlx::Error> {
        let sql = format!(
            r#"{} WHERE {} AND (p.author_id = $1 OR EXISTS (
                   SELECT 1 FROM follows f
                   WHERE f.source_id = $1 AND f.target_id = p.author_id AND f.state = 'accepted'))
               ORDER BY p.created_at DESC, p.id DESC
               LIMIT $2 OFFSET $3"#,
            SELECT_VIEW, VISIBLE
        );
        sqlx::query_as::<_, PostView>(&sql)
            .bind(viewer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// One author's visible posts. Privacy gating happens in the handler,
    /// which already holds the author row.
    pub async fn by_author<'e>(
        executor: impl PgExecutor<'e>,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostView>, sqlx::Error> {
        let sql = format!(
            r#"{} WHERE {} AND p.author_id = $1
               ORDER BY p.created_at DESC, p.id DESC
               LIMIT $2 OFFSET $3"#,
            SELECT_VIEW, VISIBLE
        );
        sqlx::query_as::<_, PostView>(&sql)
            .bind(author_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Visible posts carrying a tag, private authors gated against the viewer.
    pub async fn by_tag<'e>(
        executor: impl PgExecutor<'e>,
        tag: &str,
        viewer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostView>, sqlx::Error> {
        let sql = format!(
            r#"{} JOIN post_tags t ON t.post_id = p.id
               WHERE {} AND t.tag = $1
               AND (NOT u.is_private OR u.id = $2 OR EXISTS (
                   SELECT 1 FROM follows f
                   WHERE f.source_id = $2 AND f.target_id = u.id AND f.state = 'accepted'))
               ORDER BY p.created_at DESC, p.id DESC
               LIMIT $3 OFFSET $4"#,
            SELECT_VIEW, VISIBLE
        );
        sqlx::query_as::<_, PostView>(&sql)
            .bind(tag)
            .bind(viewer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Visible posts that mention the given user, newest first.
    pub async fn mentioning<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostView>, sqlx::Error> {
        let sql = format!(
            r#"{} JOIN mentions m ON m.post_id = p.id
               WHERE {} AND m.user_id = $1
               ORDER BY p.created_at DESC, p.id DESC
               LIMIT $2 OFFSET $3"#,
            SELECT_VIEW, VISIBLE
        );
        sqlx::query_as::<_, PostView>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    pub async fn soft_delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Moderation takedown. The `removed_at IS NULL` guard means exactly one
    /// caller wins; everyone else sees false and must not re-trigger side
    /// effects.
    pub async fn remove_for_moderation<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET removed_at = now(), updated_at = now() WHERE id = $1 AND removed_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Queue the post for manual review, once.
    pub async fn flag_for_review<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET review_pending = TRUE, updated_at = now() WHERE id = $1 AND review_pending = FALSE",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
