// handlers/admin/mod.rs - moderation endpoints, require_admin on top of require_auth

pub mod bans;
pub mod reports;
pub mod stats;
