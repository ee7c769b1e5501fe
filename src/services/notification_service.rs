use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::api::Pagination;
use crate::database::manager::DatabaseError;
use crate::database::Database;

/// Notification sources, in tie-break order. Each maps to one table:
/// likes on my posts, mentions of me, accepted follows of me, unread
/// direct messages to me.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationKind {
    Like,
    Mention,
    Follow,
    Message,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Mention => "mention",
            NotificationKind::Follow => "follow",
            NotificationKind::Message => "message",
        }
    }
}

/// Common row shape all four source queries project into.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub event_id: Uuid,
    pub actor_id: Uuid,
    pub actor_username: String,
    pub actor_display_name: Option<String>,
    pub actor_avatar_url: Option<String>,
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub event_id: Uuid,
    pub actor_id: Uuid,
    pub actor_username: String,
    pub actor_display_name: Option<String>,
    pub actor_avatar_url: Option<String>,
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    fn from_row(kind: NotificationKind, row: NotificationRow) -> Self {
        Self {
            kind,
            event_id: row.event_id,
            actor_id: row.actor_id,
            actor_username: row.actor_username,
            actor_display_name: row.actor_display_name,
            actor_avatar_url: row.actor_avatar_url,
            post_id: row.post_id,
            created_at: row.created_at,
            read: row.read,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "type": self.kind.as_str(),
            "id": self.event_id,
            "actor": {
                "id": self.actor_id,
                "username": self.actor_username,
                "display_name": self.actor_display_name,
                "avatar_url": self.actor_avatar_url,
            },
            "post_id": self.post_id,
            "created_at": self.created_at,
            "read": self.read,
        })
    }
}

/// Per-source unread totals; the wire number is their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnreadBreakdown {
    pub likes: i64,
    pub mentions: i64,
    pub follows: i64,
    pub messages: i64,
}

impl UnreadBreakdown {
    pub fn total(&self) -> i64 {
        self.likes + self.mentions + self.follows + self.messages
    }
}

pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub async fn new() -> Result<Self, DatabaseError> {
        let pool = Database::pool().await?;
        Ok(Self { pool })
    }

    /// One feed page, merged from the four sources. Each source is fetched
    /// newest-first with `LIMIT offset+limit`; that window is the most any
    /// single source can contribute to the requested page, so the pure
    /// merge below sees everything it needs.
    #[tracing::instrument(skip_all, name = "notifications.page", fields(recipient = %recipient))]
    pub async fn page_for(
        &self,
        recipient: Uuid,
        page: Pagination,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let window = page.window();

        let likes = self.recent_likes(recipient, window).await?;
        let mentions = self.recent_mentions(recipient, window).await?;
        let follows = self.recent_follows(recipient, window).await?;
        let messages = self.recent_messages(recipient, window).await?;

        Ok(merge_page(
            recipient,
            page,
            vec![
                (NotificationKind::Like, likes),
                (NotificationKind::Mention, mentions),
                (NotificationKind::Follow, follows),
                (NotificationKind::Message, messages),
            ],
        ))
    }

    /// Unread events across all four sources, one round trip.
    #[tracing::instrument(skip_all, name = "notifications.unread", fields(recipient = %recipient))]
    pub async fn unread_counts(&self, recipient: Uuid) -> Result<UnreadBreakdown, sqlx::Error> {
        let (likes, mentions, follows, messages): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT count(*) FROM likes l
                    JOIN posts p ON p.id = l.post_id
                    JOIN users u ON u.id = l.user_id
                    WHERE p.author_id = $1 AND l.seen = FALSE
                      AND l.user_id <> $1
                      AND p.removed_at IS NULL AND p.deleted_at IS NULL
                      AND u.is_active AND u.deleted_at IS NULL),
                (SELECT count(*) FROM mentions m
                    JOIN posts p ON p.id = m.post_id
                    JOIN users u ON u.id = p.author_id
                    WHERE m.user_id = $1 AND m.seen = FALSE
                      AND p.author_id <> $1
                      AND p.removed_at IS NULL AND p.deleted_at IS NULL
                      AND u.is_active AND u.deleted_at IS NULL),
                (SELECT count(*) FROM follows f
                    JOIN users u ON u.id = f.source_id
                    WHERE f.target_id = $1 AND f.state = 'accepted' AND f.seen = FALSE
                      AND f.source_id <> $1
                      AND u.is_active AND u.deleted_at IS NULL),
                (SELECT count(*) FROM messages m
                    JOIN users u ON u.id = m.sender_id
                    WHERE m.recipient_id = $1 AND m.read = FALSE
                      AND m.sender_id <> $1
                      AND u.is_active AND u.deleted_at IS NULL)
            "#,
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;

        Ok(UnreadBreakdown {
            likes,
            mentions,
            follows,
            messages,
        })
    }

    /// Flip the read flag on every source for this recipient in a single
    /// transaction. The updates are deliberately broader than the feed
    /// filters (actor state is ignored) so no hidden row keeps the unread
    /// count above zero. Returns how many flags flipped.
    #[tracing::instrument(skip_all, name = "notifications.read_all", fields(recipient = %recipient))]
    pub async fn mark_all_read(&self, recipient: Uuid) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let likes = sqlx::query(
            r#"
            UPDATE likes SET seen = TRUE
            FROM posts
            WHERE posts.id = likes.post_id AND posts.author_id = $1 AND likes.seen = FALSE
            "#,
        )
        .bind(recipient)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let mentions =
            sqlx::query("UPDATE mentions SET seen = TRUE WHERE user_id = $1 AND seen = FALSE")
                .bind(recipient)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let follows = sqlx::query(
            "UPDATE follows SET seen = TRUE WHERE target_id = $1 AND state = 'accepted' AND seen = FALSE",
        )
        .bind(recipient)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let messages =
            sqlx::query("UPDATE messages SET read = TRUE WHERE recipient_id = $1 AND read = FALSE")
                .bind(recipient)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        tx.commit().await?;

        Ok(likes + mentions + follows + messages)
    }

    async fn recent_likes(
        &self,
        recipient: Uuid,
        window: i64,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT l.id AS event_id,
                   u.id AS actor_id,
                   u.username AS actor_username,
                   u.display_name AS actor_display_name,
                   u.avatar_url AS actor_avatar_url,
                   l.post_id AS post_id,
                   l.created_at AS created_at,
                   l.seen AS "read"
            FROM likes l
            JOIN posts p ON p.id = l.post_id
            JOIN users u ON u.id = l.user_id
            WHERE p.author_id = $1
              AND l.user_id <> $1
              AND p.removed_at IS NULL AND p.deleted_at IS NULL
              AND u.is_active AND u.deleted_at IS NULL
            ORDER BY l.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient)
        .bind(window)
        .fetch_all(&self.pool)
        .await
    }

    async fn recent_mentions(
        &self,
        recipient: Uuid,
        window: i64,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT m.id AS event_id,
                   u.id AS actor_id,
                   u.username AS actor_username,
                   u.display_name AS actor_display_name,
                   u.avatar_url AS actor_avatar_url,
                   m.post_id AS post_id,
                   m.created_at AS created_at,
                   m.seen AS "read"
            FROM mentions m
            JOIN posts p ON p.id = m.post_id
            JOIN users u ON u.id = p.author_id
            WHERE m.user_id = $1
              AND p.author_id <> $1
              AND p.removed_at IS NULL AND p.deleted_at IS NULL
              AND u.is_active AND u.deleted_at IS NULL
            ORDER BY m.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient)
        .bind(window)
        .fetch_all(&self.pool)
        .await
    }

    /// Accepted follows only; the event timestamp is the acceptance, not
    /// the original request.
    async fn recent_follows(
        &self,
        recipient: Uuid,
        window: i64,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT f.id AS event_id,
                   u.id AS actor_id,
                   u.username AS actor_username,
                   u.display_name AS actor_display_name,
                   u.avatar_url AS actor_avatar_url,
                   NULL::uuid AS post_id,
                   f.accepted_at AS created_at,
                   f.seen AS "read"
            FROM follows f
            JOIN users u ON u.id = f.source_id
            WHERE f.target_id = $1 AND f.state = 'accepted' AND f.accepted_at IS NOT NULL
              AND f.source_id <> $1
              AND u.is_active AND u.deleted_at IS NULL
            ORDER BY f.accepted_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient)
        .bind(window)
        .fetch_all(&self.pool)
        .await
    }

    /// Unread only: reading a message removes it from the feed, unlike the
    /// seen-flagged sources which merely flip to read.
    async fn recent_messages(
        &self,
        recipient: Uuid,
        window: i64,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT m.id AS event_id,
                   u.id AS actor_id,
                   u.username AS actor_username,
                   u.display_name AS actor_display_name,
                   u.avatar_url AS actor_avatar_url,
                   NULL::uuid AS post_id,
                   m.created_at AS created_at,
                   m.read AS "read"
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.recipient_id = $1 AND m.read = FALSE
              AND m.sender_id <> $1
              AND u.is_active AND u.deleted_at IS NULL
            ORDER BY m.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(recipient)
        .bind(window)
        .fetch_all(&self.pool)
        .await
    }
}

/// Merge the per-source windows into one page: drop anything self-caused,
/// sort newest first with a deterministic tie-break (timestamp, then kind,
/// then event id), then slice out the requested page.
pub fn merge_page(
    recipient: Uuid,
    page: Pagination,
    sources: Vec<(NotificationKind, Vec<NotificationRow>)>,
) -> Vec<Notification> {
    let mut all: Vec<Notification> = sources
        .into_iter()
        .flat_map(|(kind, rows)| {
            rows.into_iter()
                .map(move |row| Notification::from_row(kind, row))
        })
        .filter(|n| n.actor_id != recipient)
        .collect();

    all.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.event_id.cmp(&b.event_id))
    });

    all.into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn page(page: i64, limit: i64) -> Pagination {
        Pagination { page, limit }
    }

    fn row(actor: Uuid, at: DateTime<Utc>) -> NotificationRow {
        NotificationRow {
            event_id: Uuid::new_v4(),
            actor_id: actor,
            actor_username: "actor".into(),
            actor_display_name: None,
            actor_avatar_url: None,
            post_id: None,
            created_at: at,
            read: false,
        }
    }

    #[test]
    fn self_caused_events_never_surface() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();

        let merged = merge_page(
            me,
            page(1, 10),
            vec![
                (NotificationKind::Like, vec![row(me, now), row(other, now)]),
                (NotificationKind::Mention, vec![row(me, now)]),
            ],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].actor_id, other);
    }

    #[test]
    fn feed_is_strictly_timestamp_descending_across_sources() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let base = Utc::now();

        let merged = merge_page(
            me,
            page(1, 10),
            vec![
                (
                    NotificationKind::Like,
                    vec![row(other, base), row(other, base - Duration::seconds(30))],
                ),
                (
                    NotificationKind::Message,
                    vec![row(other, base - Duration::seconds(10))],
                ),
                (
                    NotificationKind::Follow,
                    vec![row(other, base - Duration::seconds(20))],
                ),
            ],
        );

        let times: Vec<_> = merged.iter().map(|n| n.created_at).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(times, sorted);
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn equal_timestamps_break_ties_by_kind_then_id() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();

        let like_a = row(other, now);
        let like_b = row(other, now);
        let follow = row(other, now);

        let merged = merge_page(
            me,
            page(1, 10),
            vec![
                (NotificationKind::Follow, vec![follow]),
                (NotificationKind::Like, vec![like_b.clone(), like_a.clone()]),
            ],
        );

        assert_eq!(merged[0].kind, NotificationKind::Like);
        assert_eq!(merged[1].kind, NotificationKind::Like);
        assert_eq!(merged[2].kind, NotificationKind::Follow);
        // Same kind and timestamp: event id decides, ascending.
        assert!(merged[0].event_id < merged[1].event_id);
    }

    #[test]
    fn merge_is_deterministic_regardless_of_source_order() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();

        let a = row(other, now);
        let b = row(other, now - Duration::seconds(5));
        let c = row(other, now - Duration::seconds(9));

        let forward = merge_page(
            me,
            page(1, 10),
            vec![
                (NotificationKind::Like, vec![a.clone()]),
                (NotificationKind::Message, vec![b.clone(), c.clone()]),
            ],
        );
        let backward = merge_page(
            me,
            page(1, 10),
            vec![
                (NotificationKind::Message, vec![c, b]),
                (NotificationKind::Like, vec![a]),
            ],
        );

        let forward_ids: Vec<_> = forward.iter().map(|n| n.event_id).collect();
        let backward_ids: Vec<_> = backward.iter().map(|n| n.event_id).collect();
        assert_eq!(forward_ids, backward_ids);
    }

    #[test]
    fn paging_slices_the_merged_stream() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let base = Utc::now();

        let rows: Vec<NotificationRow> = (0..7)
            .map(|i| row(other, base - Duration::seconds(i)))
            .collect();

        let page_two = merge_page(
            me,
            page(2, 3),
            vec![(NotificationKind::Like, rows.clone())],
        );

        assert_eq!(page_two.len(), 3);
        assert_eq!(page_two[0].created_at, base - Duration::seconds(3));
        assert_eq!(page_two[2].created_at, base - Duration::seconds(5));

        let page_three = merge_page(me, page(3, 3), vec![(NotificationKind::Like, rows)]);
        assert_eq!(page_three.len(), 1);
    }

    #[test]
    fn short_sources_are_fine() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let merged = merge_page(
            me,
            page(1, 50),
            vec![
                (NotificationKind::Like, vec![row(other, Utc::now())]),
                (NotificationKind::Mention, vec![]),
                (NotificationKind::Follow, vec![]),
                (NotificationKind::Message, vec![]),
            ],
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn unread_total_is_the_sum_of_sources() {
        let counts = UnreadBreakdown {
            likes: 3,
            mentions: 1,
            follows: 0,
            messages: 7,
        };
        assert_eq!(counts.total(), 11);
        assert_eq!(UnreadBreakdown::default().total(), 0);
    }

    #[test]
    fn notification_json_carries_type_and_actor() {
        let n = Notification::from_row(NotificationKind::Follow, row(Uuid::new_v4(), Utc::now()));
        let value = n.to_json();
        assert_eq!(value["type"], "follow");
        assert_eq!(value["actor"]["username"], "actor");
        assert_eq!(value["read"], false);
    }
}
