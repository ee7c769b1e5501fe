// handlers/mod.rs - Handlers by security tier
//
// Public (no auth) -> Protected (bearer token, /api/*) -> Admin (/api/admin/*)

pub mod admin;
pub mod protected;
pub mod public;
