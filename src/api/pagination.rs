use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Clamped pagination window. Pages are 1-based; limits are capped by
/// config so a client cannot ask for the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

/// Ceiling on the page number. Deep enough for any real feed, and keeps
/// `offset()` far away from i64 overflow for every allowed limit.
pub const MAX_PAGE: i64 = 1_000_000;

impl Pagination {
    pub fn from_params(params: PageParams) -> Self {
        let api = &config::config().api;
        Self::clamped(params, api.default_page_size, api.max_page_size)
    }

    fn clamped(params: PageParams, default_limit: i64, max_limit: i64) -> Self {
        let page = params.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = params
            .limit
            .unwrap_or(default_limit)
            .clamp(1, max_limit.max(1));
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Rows to fetch per source when one page is merged out of several
    /// streams: everything up to and including the requested page.
    pub fn window(&self) -> i64 {
        self.offset().saturating_add(self.limit)
    }

    pub fn meta(&self) -> Value {
        json!({ "page": self.page, "limit": self.limit })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PageParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid pagination parameters: {}", e)))?;
        Ok(Self::from_params(params))
    }
}
