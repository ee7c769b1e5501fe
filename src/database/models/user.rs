use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub is_private: bool,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact user shape embedded in posts, notifications and listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub password_hash: &'a str,
    pub display_name: Option<&'a str>,
    pub role: &'a str,
}

/// Post / follower / following totals shown on a profile
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProfileCounts {
    pub posts: i64,
    pub followers: i64,
    pub following: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Fetch a user row by id; soft-deleted rows are invisible.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Case-insensitive username lookup; soft-deleted rows are invisible.
    pub async fn find_by_username<'e>(
        executor: impl PgExecutor<'e>,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE lower(username) = lower($1) AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        new_user: NewUser<'_>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, display_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.display_name)
        .bind(new_user.role)
        .fetch_one(executor)
        .await
    }

    /// Partial profile update; absent fields keep their current value.
    pub async fn update_profile<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        display_name: Option<&str>,
        bio: Option<&str>,
        avatar_url: Option<&str>,
        is_private: Option<bool>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                display_name = COALESCE($2, display_name),
                bio = COALESCE($3, bio),
                avatar_url = COALESCE($4, avatar_url),
                is_private = COALESCE($5, is_private),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(display_name)
        .bind(bio)
        .bind(avatar_url)
        .bind(is_private)
        .fetch_optional(executor)
        .await
    }

    /// Soft delete: the row stays for referential integrity, the account
    /// disappears from every lookup and can no longer authenticate.
    pub async fn soft_delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users SET deleted_at = now(), is_active = FALSE, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn search<'e>(
        executor: impl PgExecutor<'e>,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let pattern = like_pattern(query);
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, display_name, avatar_url
            FROM users
            WHERE (username ILIKE $1 OR display_name ILIKE $1)
              AND deleted_at IS NULL AND is_active
            ORDER BY username
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn profile_counts<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<ProfileCounts, sqlx::Error> {
        let (posts, followers, following): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT count(*) FROM posts p
                    WHERE p.author_id = $1 AND p.deleted_at IS NULL AND p.removed_at IS NULL),
                (SELECT count(*) FROM follows f
                    WHERE f.target_id = $1 AND f.state = 'accepted'),
                (SELECT count(*) FROM follows f
                    WHERE f.source_id = $1 AND f.state = 'accepted')
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(ProfileCounts {
            posts,
            followers,
            following,
        })
    }
}

/// Escape LIKE wildcards so user-supplied search text matches literally.
pub fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bob"), "%bob%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c\\d"), "%c\\\\d%");
    }

    #[test]
    fn admin_role_is_detected() {
        let mut user = sample_user();
        assert!(!user.is_admin());
        user.role = ROLE_ADMIN.to_string();
        assert!(user.is_admin());
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "wren".into(),
            email: None,
            password_hash: "x".into(),
            display_name: None,
            bio: String::new(),
            avatar_url: None,
            role: ROLE_USER.into(),
            is_private: false,
            is_active: true,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
