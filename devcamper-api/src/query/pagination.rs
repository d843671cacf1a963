//! Page window arithmetic and next/prev descriptors
//!
//! ```rust
//! use devcamper_api::query::PageWindow;
//!
//! let window = PageWindow::new(2, 10);
//! assert_eq!(window.start_index(), 10);
//! assert_eq!(window.end_index(), 20);
//!
//! let pagination = window.pagination(25);
//! assert_eq!(pagination.next.unwrap().page, 3);
//! assert_eq!(pagination.prev.unwrap().page, 1);
//! ```

use serde::{Deserialize, Serialize};

/// Link to a neighbouring page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Page number
    pub page: u64,
    /// Page size
    pub limit: u64,
}

/// Pagination block of a paged response. Serializes as `{}` when both are absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Present iff more documents follow this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PageCursor>,
    /// Present iff documents precede this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageCursor>,
}

/// Requested page and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: u64,
    limit: u64,
}

impl PageWindow {
    /// Create a window; zero values are clamped to one
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// 1-based page number
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Page size
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// `(page - 1) * limit`, the number of documents to skip
    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `page * limit`
    pub fn end_index(&self) -> u64 {
        self.page.saturating_mul(self.limit)
    }

    /// Neighbouring pages given the number of matching documents
    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            next: (self.end_index() < total).then(|| PageCursor {
                page: self.page + 1,
                limit: self.limit,
            }),
            prev: (self.start_index() > 0).then(|| PageCursor {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }
}
