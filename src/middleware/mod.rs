pub mod admin;
pub mod auth;

pub use auth::CurrentUser;
