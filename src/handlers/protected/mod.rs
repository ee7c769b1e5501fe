pub mod auth;
pub mod follows;
pub mod media;
pub mod mentions;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod tags;
pub mod users;
