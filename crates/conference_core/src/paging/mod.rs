//! Pagination engine shared by repositories and the HTTP adapter.
//!
//! # Responsibility
//! - Parse page/size/sort query parameters into a `PageRequest`.
//! - Carry a bounded result window plus its totals (`Page`).
//! - Build `Link` and `X-Total-Count` header values for a page.
//!
//! # Invariants
//! - Page numbers are zero-based.
//! - Sorting only ever uses fields an entity declares sortable.
//! - No implicit tie-break key is added beyond the requested sort.

mod links;
mod request;

pub use links::{pagination_headers, PaginationHeaders, LINK_HEADER, TOTAL_COUNT_HEADER};
pub use request::{
    Direction, PageRequest, PageRequestError, PagingDefaults, SortOrder, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};

/// One window of an ordered result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in this window, in sort order.
    pub content: Vec<T>,
    /// Zero-based page index that was requested.
    pub number: u32,
    /// Requested page size.
    pub size: u32,
    /// Number of rows across all pages.
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            total_elements,
        }
    }

    /// `ceil(total_elements / size)`; zero when there are no rows.
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(self.size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.number) + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }
}
