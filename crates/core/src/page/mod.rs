//! Page descriptor shared by every list query.

use serde::{Deserialize, Serialize};

/// Page request. With `off` set pagination is disabled: offset 0 and a
/// limit covering any table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
    #[serde(skip)]
    pub off: bool,
}

/// Disabled pagination.
pub const NO_PAGINATION: Page = Page {
    page: 0,
    per_page: 0,
    off: true,
};

/// One page of rows plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub total: i64,
    pub data: Vec<T>,
}

impl Page {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page,
            per_page,
            off: false,
        }
    }

    /// Builds a page from query parameters; `-1, -1` disables pagination.
    pub fn from_query(page: i64, per_page: i64) -> Self {
        if page == -1 && per_page == -1 {
            return NO_PAGINATION;
        }
        Self::new(page, per_page)
    }

    pub fn offset(&self) -> i64 {
        if self.off {
            return 0;
        }
        self.page.saturating_mul(self.per_page).max(0)
    }

    pub fn limit(&self) -> i64 {
        if self.off {
            return i64::MAX;
        }
        self.per_page.max(0)
    }

    /// Slice expression over a database array column. Database arrays are
    /// 1-based and the upper bound is inclusive, so the bounds are not
    /// valid for Rust slices.
    pub fn db_slice(&self, col: &str) -> String {
        if self.off {
            return format!("{col}[0:]");
        }
        format!(
            "{col}[{}:{}]",
            self.page.saturating_mul(self.per_page),
            self.page.saturating_add(1).saturating_mul(self.per_page)
        )
    }

    /// `start..end` bounds of this page inside a slice of length `len`.
    pub fn slice_bounds(&self, len: usize) -> (usize, usize) {
        if self.off {
            return (0, len);
        }
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX).min(len);
        let per_page = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        let end = start.saturating_add(per_page).min(len);
        (start, end)
    }
}
