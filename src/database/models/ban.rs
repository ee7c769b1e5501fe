use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ban {
    pub id: Uuid,
    pub user_id: Uuid,
    pub issued_by: Uuid,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub lifted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ban {
    /// The ban currently in force, if any: not lifted and not past its
    /// expiry (no expiry means permanent).
    pub async fn active_for_user<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<Option<Ban>, sqlx::Error> {
        sqlx::query_as::<_, Ban>(
            r#"
            SELECT * FROM bans
            WHERE user_id = $1 AND lifted_at IS NULL
              AND (expires_at IS NULL OR expires_at > now())
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn issue<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        issued_by: Uuid,
        reason: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Ban, sqlx::Error> {
        sqlx::query_as::<_, Ban>(
            r#"
            INSERT INTO bans (user_id, issued_by, reason, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(issued_by)
        .bind(reason)
        .bind(expires_at)
        .fetch_one(executor)
        .await
    }

    /// Lift whatever ban is currently in force. False when there is none.
    pub async fn lift<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE bans SET lifted_at = now()
            WHERE user_id = $1 AND lifted_at IS NULL
              AND (expires_at IS NULL OR expires_at > now())
            "#,
        )
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
