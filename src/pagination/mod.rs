//! Pagination module
//!
//! # Overview
//!
//! Every paged feed (tag feed, user timeline, explore, activity, likes,
//! comments, direct threads) differs only in how one page is fetched and
//! where its continuation cursor lives. The controller here owns everything
//! else: the loop, the budget check, accumulation, and handing back partial
//! results when a page fails.
//!
//! ```text
//! budget.cursor() ──▶ fetch_page ──▶ PageResult ──▶ accumulate
//!      ▲                                             │
//!      └──────── can_fetch_more? ◀───────────────────┘
//! ```

mod controller;
mod types;

pub use controller::{paginate, PaginationController};
pub use types::{PageResult, PaginationBudget, DEFAULT_PAGE_SIZE};
