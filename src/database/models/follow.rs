use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use super::user::UserSummary;

pub const STATE_PENDING: &str = "pending";
pub const STATE_ACCEPTED: &str = "accepted";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Follow {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub state: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Incoming pending request joined with the requester.
#[derive(Debug, Clone, FromRow)]
pub struct FollowRequestView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source_id: Uuid,
    pub source_username: String,
    pub source_display_name: Option<String>,
    pub source_avatar_url: Option<String>,
}

impl FollowRequestView {
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "created_at": self.created_at,
            "user": {
                "id": self.source_id,
                "username": self.source_username,
                "display_name": self.source_display_name,
                "avatar_url": self.source_avatar_url,
            },
        })
    }
}

impl Follow {
    /// Create or return the existing follow edge. Public targets accept
    /// immediately, private targets get a pending request. Re-following is
    /// idempotent and returns the current row untouched.
    pub async fn request(
        pool: &PgPool,
        source_id: Uuid,
        target_id: Uuid,
        target_is_private: bool,
    ) -> Result<Follow, sqlx::Error> {
        let state = if target_is_private {
            STATE_PENDING
        } else {
            STATE_ACCEPTED
        };

        // Auto-accepted edges get accepted_at = created_at, both from the
        // same transaction clock.
        let inserted = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (source_id, target_id, state, accepted_at)
            VALUES ($1, $2, $3, CASE WHEN $3 = 'accepted' THEN now() END)
            ON CONFLICT (source_id, target_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(source_id)
        .bind(target_id)
        .bind(state)
        .fetch_optional(pool)
        .await?;

        match inserted {
            Some(follow) => Ok(follow),
            // Conflict: the edge already exists, hand back its current state.
            None => {
                let existing = Self::find_between(pool, source_id, target_id).await?;
                existing.ok_or(sqlx::Error::RowNotFound)
            }
        }
    }

    pub async fn find_between<'e>(
        executor: impl PgExecutor<'e>,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Follow>, sqlx::Error> {
        sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE source_id = $1 AND target_id = $2",
        )
        .bind(source_id)
        .bind(target_id)
        .fetch_optional(executor)
        .await
    }

    /// Unfollow or cancel a pending request.
    pub async fn delete_between<'e>(
        executor: impl PgExecutor<'e>,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM follows WHERE source_id = $1 AND target_id = $2")
            .bind(source_id)
            .bind(target_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Accept a pending request addressed to `target_id`. The state guard
    /// makes a second accept a no-op that reports not-found.
    pub async fn accept<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Follow>, sqlx::Error> {
        sqlx::query_as::<_, Follow>(
            r#"
            UPDATE follows SET state = 'accepted', accepted_at = now()
            WHERE id = $1 AND target_id = $2 AND state = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(target_id)
        .fetch_optional(executor)
        .await
    }

    /// Reject (delete) a pending request addressed to `target_id`.
    pub async fn reject<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE id = $1 AND target_id = $2 AND state = 'pending'",
        )
        .bind(id)
        .bind(target_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn incoming_requests<'e>(
        executor: impl PgExecutor<'e>,
        target_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FollowRequestView>, sqlx::Error> {
        sqlx::query_as::<_, FollowRequestView>(
            r#"
            SELECT f.id, f.created_at,
                   u.id AS source_id,
                   u.username AS source_username,
                   u.display_name AS source_display_name,
                   u.avatar_url AS source_avatar_url
            FROM follows f
            JOIN users u ON u.id = f.source_id
            WHERE f.target_id = $1 AND f.state = 'pending'
              AND u.is_active AND u.deleted_at IS NULL
            ORDER BY f.created_at DESC, f.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(target_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn followers<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url
            FROM follows f
            JOIN users u ON u.id = f.source_id
            WHERE f.target_id = $1 AND f.state = 'accepted'
              AND u.is_active AND u.deleted_at IS NULL
            ORDER BY f.accepted_at DESC, f.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn following<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.display_name, u.avatar_url
            FROM follows f
            JOIN users u ON u.id = f.target_id
            WHERE f.source_id = $1 AND f.state = 'accepted'
              AND u.is_active AND u.deleted_at IS NULL
            ORDER BY f.accepted_at DESC, f.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    /// True when `source_id` has an accepted follow of `target_id`.
    pub async fn is_accepted<'e>(
        executor: impl PgExecutor<'e>,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM follows
                WHERE source_id = $1 AND target_id = $2 AND state = 'accepted'
            )
            "#,
        )
        .bind(source_id)
        .bind(target_id)
        .fetch_one(executor)
        .await?;
        Ok(exists.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_view_json_nests_the_requester() {
        let view = FollowRequestView {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source_id: Uuid::new_v4(),
            source_username: "finch".into(),
            source_display_name: None,
            source_avatar_url: None,
        };
        let value = view.to_json();
        assert_eq!(value["user"]["username"], "finch");
        assert!(value.get("source_username").is_none());
    }
}
