//! Feature-operation glue
//!
//! A paged feature is assembled from three capabilities plus the shared
//! executor:
//!
//! - [`AddressBuilder`]: cursor to page address
//! - [`RequestIdentity`]: device/session headers or a signed body
//! - [`PageDecoder`]: raw body to [`PageResult`](crate::pagination::PageResult)
//!
//! [`FeedOperation`] wires them to the executor and the pagination
//! controller, and converts every failure into an envelope.

mod decoder;
mod operation;
mod types;

pub use decoder::{CursorLocation, FeedPage, JsonPageDecoder, PageDecoder};
pub use operation::FeedOperation;
pub use types::{AddressBuilder, DeviceHeaders, NoIdentity, RequestIdentity};
