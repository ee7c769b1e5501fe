use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::auth;
use crate::database::models::{Ban, User};
use crate::database::Database;
use crate::error::ApiError;

/// Authenticated caller, loaded fresh from the database on every request so
/// deactivation, deletion and bans take effect immediately, not at token
/// expiry.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl std::ops::Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Bearer token to user row. Rejects missing/invalid tokens (401), users
/// that no longer exist (401), deactivated accounts (403) and active bans
/// (403, body carries reason and expiry).
pub async fn require_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;
    let claims = auth::validate_token(&token)?;

    let pool = Database::pool().await?;
    let user = User::find_by_id(&pool, claims.sub).await?.ok_or_else(|| {
        tracing::warn!("Valid token for missing or deleted user {}", claims.sub);
        ApiError::unauthorized("Account no longer exists")
    })?;

    if !user.is_active {
        return Err(ApiError::AccountDeactivated);
    }

    if let Some(ban) = Ban::active_for_user(&pool, user.id).await? {
        tracing::warn!("Banned user '{}' attempted API access", user.username);
        return Err(ApiError::AccountBanned {
            reason: ban.reason,
            expires_at: ban.expires_at,
        });
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(extract_bearer(&HeaderMap::new()).is_err());
    }

    #[test]
    fn non_bearer_schemes_are_rejected() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert!(extract_bearer(&headers).is_err());
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        let headers = headers_with("Bearer   ");
        assert!(extract_bearer(&headers).is_err());
    }
}
