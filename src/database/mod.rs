pub mod manager;
pub mod models;

pub use manager::{Database, DatabaseError};

/// True when the error is a Postgres unique-constraint violation.
/// Used to turn racing inserts (usernames, likes, reports) into 409s.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}
