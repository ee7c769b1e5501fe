use sqlx::PgPool;
use uuid::Uuid;

use crate::config::{self, ModerationConfig};
use crate::database::manager::DatabaseError;
use crate::database::models::{Post, Report};
use crate::database::Database;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("This post has already been reported by this user")]
    AlreadyReported,
    #[error("Post not found")]
    PostNotFound,
    #[error("Authors cannot report their own posts")]
    OwnPost,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// What the report engine did as a consequence of the newest report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    None,
    FlaggedForReview,
    Removed,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::None => "none",
            ModerationAction::FlaggedForReview => "flagged_for_review",
            ModerationAction::Removed => "removed",
        }
    }
}

/// Threshold decision only; side effects happen elsewhere. Removal wins
/// when both thresholds are crossed.
pub fn decide_action(report_count: i64, thresholds: &ModerationConfig) -> ModerationAction {
    if report_count >= thresholds.auto_remove_threshold {
        ModerationAction::Removed
    } else if report_count >= thresholds.auto_review_threshold {
        ModerationAction::FlaggedForReview
    } else {
        ModerationAction::None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportOutcome {
    pub report_id: Uuid,
    pub report_count: i64,
    pub action: ModerationAction,
}

pub struct ModerationService {
    pool: PgPool,
}

impl ModerationService {
    pub async fn new() -> Result<Self, DatabaseError> {
        let pool = Database::pool().await?;
        Ok(Self { pool })
    }

    /// File a report and run auto-moderation, all in one transaction:
    /// insert (duplicate pair rejected), recount, then act on the count.
    /// The guarded updates in the models make the takedown and the review
    /// flag single-transition, so concurrent reports crossing a threshold
    /// together trigger each side effect once.
    #[tracing::instrument(skip_all, name = "moderation.report", fields(post = %post_id))]
    pub async fn submit_report(
        &self,
        reporter_id: Uuid,
        post_id: Uuid,
        reason: &str,
    ) -> Result<ReportOutcome, ReportError> {
        let mut tx = self.pool.begin().await?;

        let post = Post::find_visible(&mut *tx, post_id)
            .await?
            .ok_or(ReportError::PostNotFound)?;
        if post.author_id == reporter_id {
            return Err(ReportError::OwnPost);
        }

        let report_id = Report::insert(&mut *tx, reporter_id, post_id, reason)
            .await?
            .ok_or(ReportError::AlreadyReported)?;

        let report_count = Report::count_for_post(&mut *tx, post_id).await?;
        let action = decide_action(report_count, &config::config().moderation);

        match action {
            ModerationAction::Removed => {
                if Post::remove_for_moderation(&mut *tx, post_id).await? {
                    Report::action_all_for_post(&mut *tx, post_id, None).await?;
                    tracing::warn!(
                        "Post {} auto-removed after {} reports",
                        post_id,
                        report_count
                    );
                }
            }
            ModerationAction::FlaggedForReview => {
                if Post::flag_for_review(&mut *tx, post_id).await? {
                    tracing::info!(
                        "Post {} flagged for review after {} reports",
                        post_id,
                        report_count
                    );
                }
            }
            ModerationAction::None => {}
        }

        tx.commit().await?;

        Ok(ReportOutcome {
            report_id,
            report_count,
            action,
        })
    }
}
