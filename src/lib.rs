// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # instacore
//!
//! Request execution and cursor pagination core for a mobile app private API
//! client. Every feature operation (tag feed, timeline, explore, comments,
//! direct threads) is a thin layer over the two pieces in this crate.
//!
//! ## Features
//!
//! - **Paced Dispatch**: Random delay before each call, configurable at runtime
//! - **Retries**: Attempt budget with backoff around transport failures only
//! - **Cursor Pagination**: Page and item budgets, feed-driven stop, partial results on failure
//! - **Envelopes**: Every public operation returns success or failure, never panics or throws
//! - **Cancellation**: One token aborts pacing, sends, backoff and pagination
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use instacore::{ClientConfig, FeedOperation, JsonPageDecoder, PaginationBudget, RequestExecutor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> instacore::Result<()> {
//!     let config = ClientConfig::builder()
//!         .base_url("https://i.example.com/api/v1/")
//!         .request_delay(Duration::from_secs(1), Duration::from_secs(3))
//!         .max_attempts(3)
//!         .build();
//!     let executor = Arc::new(RequestExecutor::from_config(config)?);
//!
//!     let feed = FeedOperation::new(executor, tag_feed_url, JsonPageDecoder::<TagFeed>::new());
//!     let mut budget = PaginationBudget::max_items(50);
//!     let result = feed.fetch_all(&mut budget).await;
//!
//!     match result.into_parts() {
//!         (Some(items), None) => println!("{} items", items.len()),
//!         (partial, Some(err)) => println!("failed after {:?} items: {err}", partial.map(|p| p.len())),
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       FeedOperation                             │
//! │   AddressBuilder     RequestIdentity     PageDecoder            │
//! └─────────────────────────────────────────────────────────────────┘
//!                 │                                  │
//! ┌───────────────┴──────────────┐   ┌───────────────┴─────────────┐
//! │     PaginationController     │   │       RequestExecutor       │
//! ├──────────────────────────────┤   ├─────────────────────────────┤
//! │ Budget (pages / items)       │──▶│ Pacing      Rate ceiling    │
//! │ Cursor stop check            │   │ Retry       Backoff         │
//! │ Partial accumulator          │   │ Logger      Transport       │
//! └──────────────────────────────┘   └─────────────────────────────┘
//!                 │
//!          ResultEnvelope<Vec<T>>
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and failure classification
pub mod error;

/// Success/failure carrier
pub mod envelope;

/// Common types and type aliases
pub mod types;

/// Client configuration
pub mod config;

/// Request/response logging
pub mod logger;

/// Paced, retrying request execution
pub mod http;

/// Budgeted cursor pagination
pub mod pagination;

/// Feature-operation glue
pub mod feed;

mod cancel;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ClientConfig, ClientConfigBuilder};
pub use envelope::ResultEnvelope;
pub use error::{Error, ErrorInfo, ErrorKind, Result};
pub use feed::{FeedOperation, FeedPage, JsonPageDecoder};
pub use http::{RequestExecutor, RequestSpec};
pub use logger::{init_tracing, NoOpLogger, RequestLogger, TracingLogger};
pub use pagination::{paginate, PageResult, PaginationBudget, PaginationController};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
