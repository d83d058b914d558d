//! Cancellation plumbing shared by the executor and the pagination controller

use crate::error::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `cancel` fires first
///
/// With no token this is a plain `.await`. Cancellation wins ties.
pub(crate) async fn until_cancelled<F: Future>(
    fut: F,
    cancel: Option<&CancellationToken>,
) -> Result<F::Output> {
    match cancel {
        None => Ok(fut.await),
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(Error::Cancelled),
                out = fut => Ok(out),
            }
        }
    }
}
