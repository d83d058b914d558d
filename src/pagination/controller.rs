//! Paged fetch loop
//!
//! One algorithm serves every paged feed: fetch, append, check the budget,
//! repeat. Pages are fetched strictly one after another. The loop is
//! iterative so call depth stays constant whatever the page count.

use super::types::{PageResult, PaginationBudget};
use crate::cancel::until_cancelled;
use crate::envelope::ResultEnvelope;
use crate::error::Error;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Drives a page-fetch capability to completion within a budget
#[derive(Debug, Clone, Default)]
pub struct PaginationController {
    cancel: Option<CancellationToken>,
}

impl PaginationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort between or during fetches when `token` fires
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
        }
    }

    /// Fetch pages until the feed or the budget says stop
    ///
    /// The first fetch always happens, using the budget's starting cursor. Later fetches
    /// happen only while [`PaginationBudget::can_fetch_more`] holds. On any
    /// failure the envelope is failed and its value is every item gathered
    /// from the pages before the failing one.
    pub async fn paginate<T, F, Fut>(
        &self,
        budget: &mut PaginationBudget,
        mut fetch_page: F,
    ) -> ResultEnvelope<Vec<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = ResultEnvelope<PageResult<T>>>,
    {
        let mut items: Vec<T> = Vec::new();

        loop {
            let page_number = budget.pages_loaded() + 1;
            if self.is_cancelled() {
                debug!("Pagination cancelled before page {}", page_number);
                return ResultEnvelope::fail_with_partial(Error::Cancelled, items);
            }

            debug!(
                "Fetching page {} (cursor: {:?})",
                page_number,
                budget.cursor()
            );

            let cursor = budget.cursor().map(str::to_owned);
            let fetched = until_cancelled(fetch_page(cursor), self.cancel.as_ref()).await;
            let page = match fetched {
                Ok(envelope) => match envelope.into_result() {
                    Ok(page) => page,
                    Err(info) => {
                        warn!(
                            "Page {} failed after {} items: {}",
                            page_number,
                            items.len(),
                            info
                        );
                        return ResultEnvelope::fail_with_partial(info, items);
                    }
                },
                Err(e) => {
                    debug!("Pagination cancelled before page {}", page_number);
                    return ResultEnvelope::fail_with_partial(e, items);
                }
            };

            let PageResult {
                items: page_items,
                next_cursor,
                more_available,
            } = page;

            budget.record_page(page_items.len(), next_cursor);
            items.extend(page_items);

            debug!(
                "Page {} loaded: {} items total, more_available={}",
                budget.pages_loaded(),
                budget.items_loaded(),
                more_available
            );

            if !budget.can_fetch_more(more_available) {
                break;
            }
        }

        ResultEnvelope::success(items)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Paginate without cancellation
pub async fn paginate<T, F, Fut>(
    budget: &mut PaginationBudget,
    fetch_page: F,
) -> ResultEnvelope<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ResultEnvelope<PageResult<T>>>,
{
    PaginationController::new().paginate(budget, fetch_page).await
}
