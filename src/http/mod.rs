//! HTTP request execution
//!
//! Provides the executor every feature operation dispatches through.
//!
//! # Features
//!
//! - **Pacing**: Random delay before each dispatch
//! - **Retries**: Attempt budget with backoff around transport failures only
//! - **Rate Limiting**: Optional token bucket ceiling using governor
//! - **Fresh Requests**: Requests are rebuilt from a [`RequestSpec`] per attempt
//! - **Cancellation**: Pacing, send and backoff all honour a cancellation token

mod client;
mod policy;
mod rate_limit;
mod request;
mod transport;

pub use client::{RequestExecutor, RequestExecutorBuilder};
pub use policy::{Backoff, PacingPolicy, RetryPolicy, Sleeper, TokioSleeper};
pub use rate_limit::RateLimiter;
pub use request::{RawResponse, RequestBody, RequestSpec, ResponseBody};
pub use transport::{ReqwestTransport, Transport};

#[cfg(test)]
mod tests;
