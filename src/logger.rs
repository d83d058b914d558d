//! Request logging
//!
//! The executor reports every outgoing request, every received response and
//! every terminal failure to a [`RequestLogger`]. [`TracingLogger`] forwards
//! them to `tracing`; [`NoOpLogger`] drops them.

use crate::error::{Error, Result};
use crate::http::{RawResponse, RequestSpec};
use crate::types::LogLevel;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Sink for request/response notifications
pub trait RequestLogger: Send + Sync {
    /// Called before each send attempt
    fn log_request(&self, request: &RequestSpec);

    /// Called when a response arrives, whatever its status
    fn log_response(&self, response: &RawResponse);

    /// Called for failures, retried or terminal
    fn log_exception(&self, error: &Error);

    /// Free-form message
    fn log_info(&self, info: &str);
}

/// Logger that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl RequestLogger for NoOpLogger {
    fn log_request(&self, _request: &RequestSpec) {}

    fn log_response(&self, _response: &RawResponse) {}

    fn log_exception(&self, _error: &Error) {}

    fn log_info(&self, _info: &str) {}
}

/// Logger that emits `tracing` events
///
/// Requests and responses go out at the configured level; exceptions are
/// always logged at `WARN` or above.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    level: LogLevel,
}

// `tracing` needs the level at compile time, hence the match.
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
            LogLevel::Error => tracing::error!($($arg)+),
        }
    };
}

impl TracingLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl RequestLogger for TracingLogger {
    fn log_request(&self, request: &RequestSpec) {
        event_at!(
            self.level,
            method = ?request.method,
            url = %request.url,
            headers = request.headers.len(),
            has_body = request.body.is_some(),
            "request"
        );
    }

    fn log_response(&self, response: &RawResponse) {
        event_at!(
            self.level,
            status = response.status().as_u16(),
            url = response.url().map_or("", |u| u.as_str()),
            "response"
        );
    }

    fn log_exception(&self, error: &Error) {
        if matches!(self.level, LogLevel::Error) {
            tracing::error!(kind = %error.kind(), "{error}");
        } else {
            tracing::warn!(kind = %error.kind(), "{error}");
        }
    }

    fn log_info(&self, info: &str) {
        event_at!(self.level, "{}", info);
    }
}

/// Install a global fmt subscriber
///
/// `RUST_LOG` directives take precedence over `default_level`. Fails if a
/// global subscriber is already set.
pub fn init_tracing(default_level: LogLevel) -> Result<()> {
    let level = LevelFilter::from_level(default_level.into());
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::config(format!("tracing subscriber already installed: {e}")))
}
