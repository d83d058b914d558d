//! Request executor
//!
//! One dispatch cycle is: wait for the rate ceiling (if any), sleep a random
//! pacing delay once, then send with retries around transport failures.
//! Every attempt rebuilds its request from the caller's closure. Responses
//! are returned as-is whatever their status; classifying them is the
//! caller's job.

use super::policy::{PacingPolicy, RetryPolicy, Sleeper, TokioSleeper};
use super::rate_limit::RateLimiter;
use super::request::{RawResponse, RequestSpec};
use super::transport::{ReqwestTransport, Transport};
use crate::cancel::until_cancelled;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::logger::{RequestLogger, TracingLogger};
use crate::types::CompletionMode;
use reqwest::StatusCode;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

/// Paced, retrying request dispatcher shared by all feature operations
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    pacing: RwLock<PacingPolicy>,
    retry: RetryPolicy,
    logger: Arc<dyn RequestLogger>,
    sleeper: Arc<dyn Sleeper>,
    rate_limiter: Option<RateLimiter>,
    base_url: Option<Url>,
    default_headers: Vec<(String, String)>,
}

impl RequestExecutor {
    /// Create an executor builder
    pub fn builder() -> RequestExecutorBuilder {
        RequestExecutorBuilder::default()
    }

    /// Create an executor from config with the default transport
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Dispatch one call
    ///
    /// `build_request` is invoked once per attempt. If every attempt fails at
    /// the transport level, the last error is returned.
    pub async fn dispatch<F>(&self, build_request: F, mode: CompletionMode) -> Result<RawResponse>
    where
        F: Fn() -> RequestSpec + Sync,
    {
        self.run(&build_request, mode, None).await
    }

    /// Like [`dispatch`](Self::dispatch), aborting promptly when `cancel` fires
    pub async fn dispatch_cancellable<F>(
        &self,
        build_request: F,
        mode: CompletionMode,
        cancel: &CancellationToken,
    ) -> Result<RawResponse>
    where
        F: Fn() -> RequestSpec + Sync,
    {
        self.run(&build_request, mode, Some(cancel)).await
    }

    /// Dispatch and read the body as text
    pub async fn send_and_get_text<F>(&self, build_request: F) -> Result<(StatusCode, String)>
    where
        F: Fn() -> RequestSpec + Sync,
    {
        let response = self
            .run(&build_request, CompletionMode::ContentRead, None)
            .await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }

    /// Change the pacing bounds for subsequent dispatches
    pub fn set_delay(&self, min: Duration, max: Duration) {
        let mut pacing = self.pacing.write().unwrap_or_else(PoisonError::into_inner);
        *pacing = PacingPolicy::new(min, max);
    }

    /// Current pacing bounds
    pub fn pacing(&self) -> PacingPolicy {
        *self.pacing.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn logger(&self) -> &Arc<dyn RequestLogger> {
        &self.logger
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve a path against the base URL
    ///
    /// Relative paths extend the base path. Absolute URLs pass through
    /// unchanged.
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        match &self.base_url {
            Some(base) => Ok(base.join(path.trim_start_matches('/'))?),
            None => Ok(Url::parse(path)?),
        }
    }

    async fn run<F>(
        &self,
        build_request: &F,
        mode: CompletionMode,
        cancel: Option<&CancellationToken>,
    ) -> Result<RawResponse>
    where
        F: Fn() -> RequestSpec + Sync,
    {
        if let Some(limiter) = &self.rate_limiter {
            until_cancelled(limiter.wait(), cancel).await?;
        }

        // Pacing applies once per dispatch, never between retries.
        if let Some(delay) = self.pacing().sample() {
            self.logger.log_info(&format!("pacing dispatch by {delay:?}"));
            until_cancelled(self.sleeper.sleep(delay), cancel).await?;
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = self.with_default_headers(build_request());
            self.logger.log_request(&request);

            let outcome = until_cancelled(self.transport.send(&request, mode), cancel)
                .await
                .and_then(|sent| sent);

            match outcome {
                Ok(response) => {
                    self.logger.log_response(&response);
                    return Ok(response);
                }
                Err(e) => {
                    self.logger.log_exception(&e);

                    if e.is_retryable() && attempt < max_attempts {
                        let delay = self.retry.backoff(attempt);
                        warn!(
                            "Transport failure on {} {}, attempt {}/{}, retrying in {:?}",
                            reqwest::Method::from(request.method),
                            request.url,
                            attempt,
                            max_attempts,
                            delay
                        );
                        until_cancelled(self.sleeper.sleep(delay), cancel).await?;
                        attempt += 1;
                        continue;
                    }

                    return Err(e);
                }
            }
        }
    }

    fn with_default_headers(&self, mut request: RequestSpec) -> RequestSpec {
        for (key, value) in &self.default_headers {
            if request.header_value(key).is_none() {
                request.headers.push((key.clone(), value.clone()));
            }
        }
        request
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("pacing", &self.pacing())
            .field("retry", &self.retry)
            .field("base_url", &self.base_url)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`RequestExecutor`]
#[derive(Default)]
pub struct RequestExecutorBuilder {
    config: ClientConfig,
    http_client: Option<reqwest::Client>,
    transport: Option<Arc<dyn Transport>>,
    logger: Option<Arc<dyn RequestLogger>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    retry: Option<RetryPolicy>,
}

impl RequestExecutorBuilder {
    /// Use this configuration
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Reuse an existing reqwest client (connection pool, proxy, ...)
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Replace the transport entirely
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom request logger
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Use a custom sleeper for pacing and backoff
    #[must_use]
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Override the retry policy from config
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Build the executor
    pub fn build(self) -> Result<RequestExecutor> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn Transport> = match (self.transport, self.http_client) {
            (Some(transport), _) => transport,
            (None, Some(client)) => Arc::new(ReqwestTransport::new(client, config.timeout())),
            (None, None) => Arc::new(ReqwestTransport::with_user_agent(
                &config.user_agent,
                config.timeout(),
            )?),
        };

        let base_url = config
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()?
            .map(with_trailing_slash);

        let mut default_headers: Vec<(String, String)> = config
            .default_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        default_headers.sort();

        Ok(RequestExecutor {
            transport,
            pacing: RwLock::new(PacingPolicy::from(&config.pacing)),
            retry: self.retry.unwrap_or_else(|| RetryPolicy::from(&config.retry)),
            logger: self
                .logger
                .unwrap_or_else(|| Arc::new(TracingLogger::new(config.log_level))),
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
            rate_limiter: config.rate_limit.as_ref().map(RateLimiter::new),
            base_url,
            default_headers,
        })
    }
}

/// Treat the base path as a directory so joins append to it instead of
/// replacing its last segment
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
