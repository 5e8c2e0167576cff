use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Raw `from` / `size` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub from: Option<i64>,
    pub size: Option<i64>,
}

/// Validated window into an ordered result set.
///
/// `from` is an element offset, but results are served in whole pages of `size`,
/// so the effective offset is rounded down to a page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(from: i64, size: i64) -> AppResult<Self> {
        if from < 0 {
            return Err(AppError::BadRequest("from must not be negative".into()));
        }
        if size <= 0 {
            return Err(AppError::BadRequest("size must be positive".into()));
        }
        Ok(Self {
            offset: (from / size) * size,
            limit: size,
        })
    }

    pub fn from_params(params: &PageParams, default_size: i64) -> AppResult<Self> {
        Self::new(params.from.unwrap_or(0), params.size.unwrap_or(default_size))
    }

    /// Everything. SQLite treats a negative LIMIT as no limit.
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_rounds_down_to_page_boundary() {
        assert_eq!(Page::new(0, 10).unwrap(), Page { offset: 0, limit: 10 });
        assert_eq!(Page::new(7, 5).unwrap(), Page { offset: 5, limit: 5 });
        assert_eq!(Page::new(20, 10).unwrap(), Page { offset: 20, limit: 10 });
    }

    #[test]
    fn negative_from_is_rejected() {
        assert!(matches!(Page::new(-1, 10), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn non_positive_size_is_rejected() {
        assert!(matches!(Page::new(0, 0), Err(AppError::BadRequest(_))));
        assert!(matches!(Page::new(0, -3), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn missing_params_use_defaults() {
        let page = Page::from_params(&PageParams::default(), 10).unwrap();
        assert_eq!(page, Page { offset: 0, limit: 10 });
    }
}
