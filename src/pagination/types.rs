//! Pagination budget and page types

use crate::types::OptionStringExt;

/// Items per page assumed when converting an item budget to a page budget
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// One fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    /// Decoded items, in feed order
    pub items: Vec<T>,
    /// Continuation token, `None` when the feed gave none
    pub next_cursor: Option<String>,
    /// Feed-reported "more pages exist" flag
    pub more_available: bool,
}

impl<T> PageResult<T> {
    /// Create a page; an empty cursor is normalised to `None`
    pub fn new(items: Vec<T>, next_cursor: Option<String>, more_available: bool) -> Self {
        Self {
            items,
            next_cursor: normalize_cursor(next_cursor),
            more_available,
        }
    }

    /// A final page with nothing after it
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None, false)
    }

    /// A page continuing at `cursor`
    pub fn with_cursor(items: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: cursor.into().none_if_empty(),
            more_available: true,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert the item type, keeping cursor and flag
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            more_available: self.more_available,
        }
    }
}

/// Limits and progress for one paginate call
///
/// Created fresh per call. Limits and the starting cursor are fixed by the
/// constructors; after that only the controller advances it, once per
/// completed page, so `pages_loaded` and `items_loaded` never decrease.
/// `cursor` is `None` exactly when there is no further page to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationBudget {
    max_items: usize,
    max_pages: usize,
    items_loaded: usize,
    pages_loaded: usize,
    cursor: Option<String>,
}

impl Default for PaginationBudget {
    fn default() -> Self {
        Self::max_pages(1)
    }
}

impl PaginationBudget {
    /// Explicit limits; both are clamped to at least one
    pub fn new(max_pages: usize, max_items: usize) -> Self {
        Self {
            max_items: max_items.max(1),
            max_pages: max_pages.max(1),
            items_loaded: 0,
            pages_loaded: 0,
            cursor: None,
        }
    }

    /// Limit by pages only
    pub fn max_pages(pages: usize) -> Self {
        Self::new(pages, usize::MAX)
    }

    /// Limit by items, deriving a page cap from [`DEFAULT_PAGE_SIZE`]
    pub fn max_items(items: usize) -> Self {
        Self::new(items.div_ceil(DEFAULT_PAGE_SIZE), items)
    }

    /// Resume from a known cursor
    #[must_use]
    pub fn start_from(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into().none_if_empty();
        self
    }

    /// Item cap; bounds fetch initiation, not the final count
    pub fn item_limit(&self) -> usize {
        self.max_items
    }

    pub fn page_limit(&self) -> usize {
        self.max_pages
    }

    pub fn items_loaded(&self) -> usize {
        self.items_loaded
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Cursor for the next fetch
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Whether another fetch may be issued
    ///
    /// This is the single stop check, evaluated before every fetch after
    /// the first.
    pub fn can_fetch_more(&self, more_available: bool) -> bool {
        more_available
            && self.cursor.is_some()
            && self.items_loaded < self.max_items
            && self.pages_loaded < self.max_pages
    }

    /// Account for one completed page
    pub(crate) fn record_page(&mut self, item_count: usize, next_cursor: Option<String>) {
        self.pages_loaded += 1;
        self.items_loaded = self.items_loaded.saturating_add(item_count);
        self.cursor = normalize_cursor(next_cursor);
    }

    /// Pages still allowed
    pub fn pages_remaining(&self) -> usize {
        self.max_pages.saturating_sub(self.pages_loaded)
    }
}

fn normalize_cursor(cursor: Option<String>) -> Option<String> {
    cursor.none_if_empty()
}
