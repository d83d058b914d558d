//! Page decoding
//!
//! Decoding is chosen per feed operation at construction time. A decoder
//! turns a raw body into a [`PageResult`], including locating the
//! continuation cursor, which some feeds put on the container and others
//! only on their items.

use crate::error::Result;
use crate::pagination::PageResult;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Turns a raw response body into one page
pub trait PageDecoder<T>: Send + Sync {
    fn decode(&self, body: &str) -> Result<PageResult<T>>;
}

/// A deserialisable feed response wrapper
pub trait FeedPage: DeserializeOwned {
    type Item;

    /// Cursor carried on the container, if any
    fn next_cursor(&self) -> Option<&str>;

    /// Whether the feed reports more pages
    fn more_available(&self) -> bool;

    /// Consume the wrapper into its items
    fn into_items(self) -> Vec<Self::Item>;
}

/// Where the continuation cursor of a page lives
pub enum CursorLocation<I> {
    /// On the response container
    Container,
    /// On the last item whose cursor field is non-empty
    LastItem(fn(&I) -> Option<&str>),
}

impl<I> CursorLocation<I> {
    /// Pick the cursor for a decoded page
    pub fn locate(&self, container: Option<&str>, items: &[I]) -> Option<String> {
        let cursor = match self {
            Self::Container => container,
            Self::LastItem(field) => items
                .iter()
                .rev()
                .find_map(|item| field(item).filter(|c| !c.is_empty())),
        };
        cursor.filter(|c| !c.is_empty()).map(str::to_owned)
    }
}

impl<I> Clone for CursorLocation<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for CursorLocation<I> {}

impl<I> Default for CursorLocation<I> {
    fn default() -> Self {
        Self::Container
    }
}

impl<I> fmt::Debug for CursorLocation<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => f.write_str("Container"),
            Self::LastItem(_) => f.write_str("LastItem(..)"),
        }
    }
}

/// JSON decoder for any [`FeedPage`] wrapper
pub struct JsonPageDecoder<W: FeedPage> {
    cursor: CursorLocation<W::Item>,
    _wrapper: PhantomData<fn() -> W>,
}

impl<W: FeedPage> JsonPageDecoder<W> {
    /// Cursor read from the container
    pub fn new() -> Self {
        Self::with_cursor(CursorLocation::Container)
    }

    pub fn with_cursor(cursor: CursorLocation<W::Item>) -> Self {
        Self {
            cursor,
            _wrapper: PhantomData,
        }
    }

    /// Cursor read from the last item that has one
    pub fn last_item_cursor(field: fn(&W::Item) -> Option<&str>) -> Self {
        Self::with_cursor(CursorLocation::LastItem(field))
    }
}

impl<W: FeedPage> Default for JsonPageDecoder<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: FeedPage> fmt::Debug for JsonPageDecoder<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonPageDecoder")
            .field("wrapper", &std::any::type_name::<W>())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<W: FeedPage> PageDecoder<W::Item> for JsonPageDecoder<W> {
    fn decode(&self, body: &str) -> Result<PageResult<W::Item>> {
        let wrapper: W = serde_json::from_str(body)?;
        let more_available = wrapper.more_available();
        let container_cursor = wrapper.next_cursor().map(str::to_owned);
        let items = wrapper.into_items();
        let cursor = self.cursor.locate(container_cursor.as_deref(), &items);

        Ok(PageResult::new(items, cursor, more_available))
    }
}
