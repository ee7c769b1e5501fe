// handlers/protected/auth.rs - GET /api/auth/whoami

use axum::extract::Extension;
use axum::response::Json;
use serde_json::{json, Value};

use crate::middleware::CurrentUser;

/// The middleware reloads the user row on every request, so this is
/// always the current state of the account, not the token snapshot.
pub async fn whoami(Extension(current): Extension<CurrentUser>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": current.0
    }))
}
