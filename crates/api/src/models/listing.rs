//! Pagination and sort direction shared by list endpoints.

use serde::{Deserialize, Serialize};

/// Sort direction for `ORDER BY` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A validated page request.
///
/// `page` is 1-based and `limit` is clamped to `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// Number of pages needed for `total` rows.
    #[must_use]
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        let limit = i64::from(self.limit);
        (total + limit - 1) / limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A page of results with the total page count.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: Vec::new(),
            total_pages: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page.limit(), 20);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_clamps_limit_and_page() {
        let page = Page::new(Some(0), Some(1000));
        assert_eq!(page.limit(), 100);
        assert_eq!(page.offset(), 0);

        let page = Page::new(Some(3), Some(0));
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), 2);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(Some(1), Some(20));
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(20), 1);
        assert_eq!(page.total_pages(21), 2);
    }

    #[test]
    fn test_direction_sql() {
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
        assert_eq!(SortDirection::default().as_sql(), "DESC");
    }
}
