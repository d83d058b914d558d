//! Paged feed operation
//!
//! Glues an address builder, an identity, and a decoder onto the shared
//! executor and the pagination controller. This is the boundary where every
//! failure becomes an envelope.

use super::decoder::PageDecoder;
use super::types::{AddressBuilder, NoIdentity, RequestIdentity};
use crate::envelope::ResultEnvelope;
use crate::error::{Error, Result};
use crate::http::{RequestExecutor, RequestSpec};
use crate::pagination::{PageResult, PaginationBudget, PaginationController};
use crate::types::CompletionMode;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One paged endpoint
pub struct FeedOperation<T> {
    executor: Arc<RequestExecutor>,
    address: Arc<dyn AddressBuilder>,
    identity: Arc<dyn RequestIdentity>,
    decoder: Arc<dyn PageDecoder<T>>,
    cancel: Option<CancellationToken>,
}

impl<T> FeedOperation<T> {
    pub fn new(
        executor: Arc<RequestExecutor>,
        address: impl AddressBuilder + 'static,
        decoder: impl PageDecoder<T> + 'static,
    ) -> Self {
        Self {
            executor,
            address: Arc::new(address),
            identity: Arc::new(NoIdentity),
            decoder: Arc::new(decoder),
            cancel: None,
        }
    }

    /// Attach identity to every request
    #[must_use]
    pub fn with_identity(mut self, identity: impl RequestIdentity + 'static) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    /// Abort fetches when `token` fires
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fetch and decode a single page
    pub async fn fetch_page(&self, cursor: Option<String>) -> ResultEnvelope<PageResult<T>> {
        match self.try_fetch_page(cursor.as_deref()).await {
            Ok(page) => ResultEnvelope::success(page),
            Err(e) => {
                debug!("Feed page failed: {}", e);
                ResultEnvelope::fail(e)
            }
        }
    }

    /// Fetch pages within `budget`
    ///
    /// On failure the envelope still carries every item from the pages
    /// that succeeded; `budget` records how far the call got.
    pub async fn fetch_all(&self, budget: &mut PaginationBudget) -> ResultEnvelope<Vec<T>> {
        let controller = match &self.cancel {
            Some(token) => PaginationController::with_cancellation(token.clone()),
            None => PaginationController::new(),
        };
        controller
            .paginate(budget, |cursor| self.fetch_page(cursor))
            .await
    }

    async fn try_fetch_page(&self, cursor: Option<&str>) -> Result<PageResult<T>> {
        let url = self.address.page_url(cursor)?;
        let build = || self.identity.apply(RequestSpec::get(url.clone()));

        let response = match &self.cancel {
            Some(token) => {
                self.executor
                    .dispatch_cancellable(build, CompletionMode::ContentRead, token)
                    .await?
            }
            None => {
                self.executor
                    .dispatch(build, CompletionMode::ContentRead)
                    .await?
            }
        };

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::unexpected_response(status.as_u16(), body));
        }

        self.decoder.decode(&body)
    }
}

impl<T> std::fmt::Debug for FeedOperation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedOperation")
            .field("executor", &self.executor)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}
