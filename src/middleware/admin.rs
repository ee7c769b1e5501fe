use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ApiError;

use super::auth::CurrentUser;

/// Admin gate for `/api/admin/*`. Layered after `require_auth`, so the
/// caller is already loaded; this only checks the role.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !current.is_admin() {
        tracing::warn!(
            "User '{}' attempted admin access without the role",
            current.username
        );
        return Err(ApiError::forbidden("Administrator access required"));
    }

    Ok(next.run(request).await)
}
