use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::pagination::{Page, PageParams};
use crate::state::AppState;
use crate::user::UserId;

pub const SHARER_HEADER: &str = "X-Sharer-User-Id";

/// The acting user, taken from the `X-Sharer-User-Id` header.
///
/// There is no authentication: the header is trusted as-is. Whether the user
/// actually exists is checked by the operations that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharerId(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for SharerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SHARER_HEADER)
            .ok_or_else(|| AppError::BadRequest(format!("Missing header {}", SHARER_HEADER)))?;

        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .map(SharerId)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid header {}", SHARER_HEADER)))
    }
}

/// Pagination from `from` / `size`, with the configured default size.
impl FromRequestParts<AppState> for Page {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PageParams>::from_request_parts(parts, state).await?;
        Page::from_params(&params, state.config.pagination.default_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<SharerId, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(SHARER_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        SharerId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn parses_numeric_header() {
        assert_eq!(extract(Some("42")).await.unwrap(), SharerId(42));
    }

    #[tokio::test]
    async fn missing_header_is_bad_request() {
        assert!(matches!(extract(None).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn non_numeric_header_is_bad_request() {
        assert!(matches!(
            extract(Some("alice")).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
