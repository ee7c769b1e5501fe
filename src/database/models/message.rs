use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// One row per conversation peer: the latest message plus how many of
/// theirs I have not read yet.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationView {
    pub peer_id: Uuid,
    pub peer_username: String,
    pub peer_display_name: Option<String>,
    pub peer_avatar_url: Option<String>,
    pub last_body: String,
    pub last_sender_id: Uuid,
    pub last_at: DateTime<Utc>,
    pub unread_count: i64,
}

impl ConversationView {
    pub fn to_json(&self) -> Value {
        json!({
            "peer": {
                "id": self.peer_id,
                "username": self.peer_username,
                "display_name": self.peer_display_name,
                "avatar_url": self.peer_avatar_url,
            },
            "last_message": {
                "body": self.last_body,
                "sender_id": self.last_sender_id,
                "created_at": self.last_at,
            },
            "unread_count": self.unread_count,
        })
    }
}

impl Message {
    pub async fn send<'e>(
        executor: impl PgExecutor<'e>,
        sender_id: Uuid,
        recipient_id: Uuid,
        body: &str,
    ) -> Result<Message, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, recipient_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(body)
        .fetch_one(executor)
        .await
    }

    /// Latest message per peer, newest conversation first. Peers whose
    /// account was deleted disappear with their threads.
    pub async fn conversations<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationView>, sqlx::Error> {
        sqlx::query_as::<_, ConversationView>(
            r#"
            SELECT * FROM (
                SELECT DISTINCT ON (peer.id)
                    peer.id AS peer_id,
                    peer.username AS peer_username,
                    peer.display_name AS peer_display_name,
                    peer.avatar_url AS peer_avatar_url,
                    m.body AS last_body,
                    m.sender_id AS last_sender_id,
                    m.created_at AS last_at,
                    (SELECT count(*) FROM messages x
                      WHERE x.sender_id = peer.id AND x.recipient_id = $1 AND NOT x.read) AS unread_count
                FROM messages m
                JOIN users peer
                  ON peer.id = CASE WHEN m.sender_id = $1 THEN m.recipient_id ELSE m.sender_id END
                WHERE (m.sender_id = $1 OR m.recipient_id = $1)
                  AND peer.deleted_at IS NULL
                ORDER BY peer.id, m.created_at DESC, m.id DESC
            ) conv
            ORDER BY conv.last_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    /// Full thread between two users, newest first.
    pub async fn thread<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        peer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = $1 AND recipient_id = $2)
               OR (sender_id = $2 AND recipient_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(peer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    /// Mark everything the peer sent me as read; returns how many flipped.
    pub async fn mark_thread_read<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        peer_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET read = TRUE WHERE recipient_id = $1 AND sender_id = $2 AND NOT read",
        )
        .bind(user_id)
        .bind(peer_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
