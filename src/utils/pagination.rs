use serde::{Deserialize, Serialize};

/// `?page=` query parameter shared by every paginated listing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
}

impl PageParams {
    /// 1-based page number; anything below 1 is treated as the first page.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Resolves LIMIT/OFFSET for the given page size.
    pub fn window(&self, per_page: i64) -> PageWindow {
        let per_page = per_page.max(1);
        PageWindow {
            page: self.page(),
            per_page,
            offset: (self.page() - 1).saturating_mul(per_page),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
}

/// One page of results plus the metadata clients need to walk the rest.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, window: PageWindow, total: i64) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            (total + window.per_page - 1) / window.per_page
        };
        Self {
            data,
            current_page: window.page,
            per_page: window.per_page,
            total,
            last_page,
        }
    }
}
