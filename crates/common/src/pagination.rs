//! Offset pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Highest page number accepted. Larger values are clamped.
pub const MAX_PAGE: u64 = 1_000_000;

/// A validated `(page, limit)` pair.
///
/// Pages are 1-based. Out-of-range input is clamped rather than rejected:
/// `page` is held to `1..=MAX_PAGE` and `limit` to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Items per page.
    pub limit: u64,
}

impl PageRequest {
    /// Build a page request, falling back to `default_limit` when unset.
    #[must_use]
    pub fn new(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Whether rows remain after this page.
    #[must_use]
    pub const fn has_more(&self, total: u64) -> bool {
        self.page.saturating_mul(self.limit) < total
    }

    /// Pagination block for a response.
    #[must_use]
    pub const fn describe(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total.div_ceil(self.limit),
            has_next: self.has_more(total),
        }
    }
}

/// Pagination metadata returned alongside ranked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// Total eligible rows.
    pub total: u64,
    /// Number of pages.
    pub total_pages: u64,
    /// Whether another page exists.
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let page = PageRequest::new(None, None, 10);
        assert_eq!(page, PageRequest { page: 1, limit: 10 });

        let page = PageRequest::new(Some(0), Some(0), 10);
        assert_eq!(page, PageRequest { page: 1, limit: 1 });

        let page = PageRequest::new(Some(3), Some(1000), 10);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn test_describe() {
        let page = PageRequest::new(Some(2), Some(10), 10);
        let meta = page.describe(25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);

        let meta = page.describe(20);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);

        let meta = PageRequest::new(None, None, 10).describe(0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let page = PageRequest::new(Some(u64::MAX), Some(100), 10);
        assert_eq!(page.page, MAX_PAGE);
        assert_eq!(page.offset(), (MAX_PAGE - 1) * 100);
        assert!(i64::try_from(page.offset()).is_ok());

        let meta = page.describe(50);
        assert!(!meta.has_next);
        assert_eq!(meta.total_pages, 1);
    }

    #[test]
    fn test_offset_saturates() {
        let page = PageRequest {
            page: u64::MAX,
            limit: MAX_PAGE_SIZE,
        };
        assert_eq!(page.offset(), u64::MAX);
        assert!(!page.has_more(u64::MAX));
    }
}
